//! Run configuration: defaults, config file, environment and flag overrides.
//!
//! Resolution order, highest priority first: command-line flags,
//! `REPO_MIRROR_*` environment variables, the TOML config file, built-in
//! defaults.  [`SyncConfig::resolve`] only merges layers; [`SyncConfig::validate`]
//! canonicalizes paths and checks them before anything touches the disk.
pub mod toml_loader;

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Config file looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "repo-mirror.toml";

/// Commit message used when none is configured.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Sync from working directory";

/// Remote used when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Directory names skipped by default: VCS metadata, interpreter caches,
/// virtualenvs and runtime logs.
pub const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    ".pytest_cache",
    ".mypy_cache",
    "logs",
];

/// File names skipped by default: local secrets and runtime state.
pub const DEFAULT_EXCLUDED_FILES: &[&str] =
    &[".env", "bot.log", "bot_state.db", "bot_state.db-journal"];

/// Directory name that is always excluded, whatever the configured list says.
pub const VCS_METADATA_DIR: &str = ".git";

/// How the mirror decides whether an existing destination file is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Same length and same modification time.
    #[default]
    Metadata,
    /// Same length and same SHA-256 digest.
    Checksum,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--config`
    pub config_file: Option<PathBuf>,
    /// `--source`
    pub source: Option<PathBuf>,
    /// `--destination`
    pub destination: Option<PathBuf>,
    /// `--message`
    pub message: Option<String>,
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Root to mirror from. Read-only for the whole run.
    pub source_path: PathBuf,
    /// Root to mirror into; a git working copy for `sync`.
    pub destination_path: PathBuf,
    /// Message for the publish commit.
    pub commit_message: String,
    /// Directory base names that are never visited on either side.
    pub excluded_directory_names: BTreeSet<String>,
    /// File base names that are never copied and are purged from the destination.
    pub excluded_file_names: BTreeSet<String>,
    /// File comparison strategy.
    pub compare: CompareMode,
    /// Per-file failures tolerated before the run is aborted.
    pub max_copy_failures: usize,
    /// Remote to pull from and push to.
    pub remote: String,
    /// Branch to publish; `None` means the destination's current branch.
    pub branch: Option<String>,
}

impl SyncConfig {
    /// Build a config with built-in defaults for everything but the two roots.
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            excluded_directory_names: to_set(DEFAULT_EXCLUDED_DIRECTORIES),
            excluded_file_names: to_set(DEFAULT_EXCLUDED_FILES),
            compare: CompareMode::default(),
            max_copy_failures: 0,
            remote: DEFAULT_REMOTE.to_string(),
            branch: None,
        }
    }

    /// Merge flags, environment, config file and defaults.
    ///
    /// `env` looks up an environment variable; `cwd` anchors relative paths
    /// given on the command line or in the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DestinationNotConfigured`] when no layer names a
    /// destination, or a parse error from the config file.
    pub fn resolve(
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        let file_path = overrides
            .config_file
            .as_ref()
            .map_or_else(|| cwd.join(DEFAULT_CONFIG_FILE), |p| cwd.join(p));
        if overrides.config_file.is_some() && !file_path.exists() {
            return Err(ConfigError::Io {
                path: file_path.display().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let file = toml_loader::load_file_config(&file_path)?;

        let source = overrides
            .source
            .clone()
            .or_else(|| env("REPO_MIRROR_SOURCE").map(PathBuf::from))
            .map(|p| cwd.join(p))
            .or(file.source)
            .unwrap_or_else(|| cwd.to_path_buf());

        let destination = overrides
            .destination
            .clone()
            .or_else(|| env("REPO_MIRROR_DESTINATION").map(PathBuf::from))
            .map(|p| cwd.join(p))
            .or(file.destination)
            .ok_or(ConfigError::DestinationNotConfigured)?;

        let mut config = Self::new(source, destination);

        if let Some(message) = overrides
            .message
            .clone()
            .or_else(|| env("REPO_MIRROR_MESSAGE"))
            .or(file.commit_message)
        {
            config.commit_message = message;
        }
        if let Some(compare) = file.compare {
            config.compare = compare;
        }
        if let Some(max) = file.max_copy_failures {
            config.max_copy_failures = max;
        }
        if let Some(remote) = file.remote {
            config.remote = remote;
        }
        config.branch = file.branch;

        if let Some(dirs) = file.exclude.directories {
            config.excluded_directory_names = dirs.into_iter().collect();
        }
        if let Some(files) = file.exclude.files {
            config.excluded_file_names = files.into_iter().collect();
        }
        config
            .excluded_directory_names
            .extend(file.exclude.extra_directories);
        config.excluded_file_names.extend(file.exclude.extra_files);
        config
            .excluded_directory_names
            .insert(VCS_METADATA_DIR.to_string());

        Ok(config)
    }

    /// Canonicalize both roots and check that they are usable directories.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either root is missing or not a directory,
    /// or if the two roots overlap.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.source_path = canonical_dir(&self.source_path, ConfigError::MissingSource)?;
        self.destination_path =
            canonical_dir(&self.destination_path, ConfigError::MissingDestination)?;

        if self.source_path.starts_with(&self.destination_path)
            || self.destination_path.starts_with(&self.source_path)
        {
            return Err(ConfigError::OverlappingPaths {
                source_path: self.source_path,
                destination_path: self.destination_path,
            });
        }
        Ok(self)
    }
}

fn to_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

fn canonical_dir(
    path: &Path,
    missing: impl FnOnce(PathBuf) -> ConfigError,
) -> Result<PathBuf, ConfigError> {
    let canonical = match dunce::canonicalize(path) {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };
    if !canonical.is_dir() {
        return Err(ConfigError::NotADirectory(canonical));
    }
    std::fs::read_dir(&canonical).map_err(|source| ConfigError::Io {
        path: canonical.display().to_string(),
        source,
    })?;
    Ok(canonical)
}
