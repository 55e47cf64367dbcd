//! Publish controller: turn a mirrored working copy into a pushed commit.
//!
//! ```text
//! STAGE ─┬─ nothing staged ──────────────────────────> NoChanges
//!        └─ changes ─> COMMIT ─> PULL_REBASE ─> PUSH ─> Committed
//! ```
//!
//! Any failing step ends the run with [`PublishOutcome::Failed`]; nothing is
//! retried and no step is skipped once a commit exists.
pub mod git;

pub use git::GitClient;

use crate::error::PublishError;
use crate::logging::Log;

/// Final state of one publish attempt.
#[derive(Debug)]
pub enum PublishOutcome {
    /// The staged tree equals the last commit; nothing was committed.
    NoChanges,
    /// A commit was created, rebased onto upstream and pushed.
    Committed,
    /// A step failed; the error names it.
    Failed(PublishError),
}

/// The version-control operations the controller needs.
///
/// Every method acts on one working copy fixed at construction; nothing
/// depends on the process's current directory.
pub trait VersionControl: std::fmt::Debug {
    /// Stage additions, modifications and deletions (`git add -A`).
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Stage`] on failure.
    fn stage_all(&self) -> Result<(), PublishError>;

    /// Whether the index differs from the last commit.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Inspect`] if the repository cannot be read.
    fn has_staged_changes(&self) -> Result<bool, PublishError>;

    /// Commit the index with `message`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Commit`] on failure.
    fn commit(&self, message: &str) -> Result<(), PublishError>;

    /// Replay local commits on top of the upstream branch.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::IntegrationConflict`] when the rebase stops on
    /// conflicts (the rebase is aborted first), [`PublishError::RebaseAbort`]
    /// if that abort fails, otherwise [`PublishError::Integration`].
    fn pull_rebase(&self) -> Result<(), PublishError>;

    /// Push the branch to the remote.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Push`] on rejection or transport failure.
    fn push(&self) -> Result<(), PublishError>;

    /// Number of local commits not on the remote-tracking branch, if known.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Inspect`] if the repository cannot be read.
    fn commits_ahead(&self) -> Result<Option<usize>, PublishError>;
}

/// Drive `vcs` through the publish state machine.
pub fn run(vcs: &dyn VersionControl, message: &str, log: &dyn Log) -> PublishOutcome {
    match publish(vcs, message, log) {
        Ok(outcome) => outcome,
        Err(e) => {
            log.error(&e.to_string());
            PublishOutcome::Failed(e)
        }
    }
}

fn publish(
    vcs: &dyn VersionControl,
    message: &str,
    log: &dyn Log,
) -> Result<PublishOutcome, PublishError> {
    log.debug("staging all changes");
    vcs.stage_all()?;

    if !vcs.has_staged_changes()? {
        log.info("no changes to commit");
        warn_if_ahead(vcs, log);
        return Ok(PublishOutcome::NoChanges);
    }

    log.debug(&format!("committing: {message}"));
    vcs.commit(message)?;

    log.debug("integrating upstream changes");
    vcs.pull_rebase()?;

    log.debug("pushing");
    vcs.push()?;

    log.info("changes committed and pushed");
    Ok(PublishOutcome::Committed)
}

/// Warn when the branch holds commits its remote-tracking branch lacks.
fn warn_if_ahead(vcs: &dyn VersionControl, log: &dyn Log) {
    match vcs.commits_ahead() {
        Ok(Some(n)) if n > 0 => log.warn(&format!(
            "branch is {n} commit(s) ahead of its upstream; an earlier push may have failed"
        )),
        Ok(_) => {}
        Err(e) => log.debug(&format!("cannot compare with upstream: {e}")),
    }
}
