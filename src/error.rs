//! Domain-specific error types for the mirror and publish pipeline.
//!
//! Internal modules return typed errors ([`ConfigError`], [`MirrorError`],
//! [`PublishError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! SyncError
//! ├── Config(ConfigError)  : missing/unreadable paths, bad config file
//! ├── Mirror(MirrorError)  : fatal copy failures
//! └── Publish(PublishError): stage, commit, rebase, push failures
//! ```
//!
//! Per-file copy failures are not errors at this level; they are collected
//! in [`CopyResult`](crate::mirror::CopyResult) and only escalate to
//! [`MirrorError::TooManyFailures`] past the configured threshold.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration could not be resolved or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The mirror step failed fatally.
    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    /// The publish step failed.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Errors raised while resolving and validating configuration.
///
/// All of these abort the run before any filesystem or VCS side effect.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The source directory does not exist.
    #[error("source directory does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    /// No destination directory was configured.
    #[error("destination directory is not configured (use --destination, REPO_MIRROR_DESTINATION or the config file)")]
    DestinationNotConfigured,

    /// The destination directory does not exist.
    #[error("destination directory does not exist: {}", .0.display())]
    MissingDestination(PathBuf),

    /// A configured path exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Source and destination overlap, so mirroring would recurse into itself.
    #[error("source {} and destination {} overlap", source_path.display(), destination_path.display())]
    OverlappingPaths {
        /// Canonical source path.
        source_path: PathBuf,
        /// Canonical destination path.
        destination_path: PathBuf,
    },

    /// The destination is not a git working copy.
    #[error("destination is not a git working copy: {path}: {message}")]
    NotAWorkingCopy {
        /// Destination path.
        path: String,
        /// Message from libgit2.
        message: String,
    },

    /// The configured remote does not exist in the destination repository.
    #[error("remote '{0}' is not configured in the destination repository")]
    MissingRemote(String),

    /// The branch to publish could not be determined (detached HEAD).
    #[error("cannot determine the branch to publish: {0}")]
    UnknownBranch(String),

    /// The `git` executable is not on `PATH`.
    #[error("git executable not found on PATH")]
    GitNotFound,

    /// The config file could not be parsed.
    #[error("invalid config file {path}: {message}")]
    InvalidFile {
        /// Config file path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while inspecting a configured path.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Fatal mirror failures.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// A tree root could not be read; nothing below it can be trusted.
    #[error("cannot read {}: {source}", path.display())]
    UnreadableRoot {
        /// The root that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Per-file failures exceeded the configured threshold.
    #[error("{failures} file operation(s) failed (allowed: {allowed}); refusing to publish a partial mirror")]
    TooManyFailures {
        /// Number of recorded per-file failures.
        failures: usize,
        /// Configured `max_copy_failures`.
        allowed: usize,
    },
}

/// Errors raised by the publish step. All are fatal.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Staging the working tree failed.
    #[error("staging failed: {0}")]
    Stage(String),

    /// Comparing the index against HEAD failed.
    #[error("cannot inspect staged changes: {0}")]
    Inspect(String),

    /// Creating the commit failed.
    #[error("commit failed: {0}")]
    Commit(String),

    /// The rebase onto upstream stopped on conflicts.
    #[error("rebase onto {upstream} produced conflicts; resolve manually in the destination repository")]
    IntegrationConflict {
        /// `<remote>/<branch>` that was being integrated.
        upstream: String,
    },

    /// The rebase stopped on conflicts and `git rebase --abort` also failed,
    /// so the destination repository is still mid-rebase.
    #[error(
        "rebase onto {upstream} produced conflicts and could not be aborted; \
         the destination repository is mid-rebase: {output}"
    )]
    RebaseAbort {
        /// `<remote>/<branch>` that was being integrated.
        upstream: String,
        /// Output of the failed abort.
        output: String,
    },

    /// Pulling upstream changes failed for a reason other than conflicts.
    #[error("pull --rebase failed: {0}")]
    Integration(String),

    /// Pushing to the remote failed (rejection, network error, credentials).
    #[error("push failed: {0}")]
    Push(String),
}
