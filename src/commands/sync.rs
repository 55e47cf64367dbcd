//! Command: mirror, then publish.
use anyhow::Result;
use std::sync::Arc;

use super::{load_config, mirror_options, record_mirror};
use crate::cli::GlobalOpts;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger, StepStatus};
use crate::mirror::{self, MirrorOptions};
use crate::publish::{self, GitClient, PublishOutcome, VersionControl};

/// Run the sync command.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the mirror fails fatally,
/// or any publish step fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    log.info(&format!("repo-mirror {}", super::version::version()));
    let config = load_config(global, log)?;
    let git = GitClient::open(&config, Arc::new(SystemExecutor))?;
    log.info(&format!("publishing to {}", git.upstream()));

    let result = execute(&config, &git, &mirror_options(global), log);
    log.print_summary();
    result?;
    Ok(())
}

/// Mirror `config` and publish the destination through `vcs`.
///
/// Returns `None` in dry-run mode, where nothing is published.
///
/// # Errors
///
/// Returns [`SyncError::Mirror`] if mirroring fails fatally (publishing is
/// then skipped) or [`SyncError::Publish`] if a publish step fails.
pub fn execute(
    config: &SyncConfig,
    vcs: &dyn VersionControl,
    opts: &MirrorOptions,
    log: &dyn Log,
) -> Result<Option<PublishOutcome>, SyncError> {
    log.stage("Mirroring");
    let copied = match mirror::run(config, opts, log) {
        Ok(copied) => copied,
        Err(e) => {
            log.error(&e.to_string());
            log.record_step("Mirror", StepStatus::Failed, Some(&e.to_string()));
            log.record_step("Publish", StepStatus::Skipped, Some("mirror failed"));
            return Err(e.into());
        }
    };
    log.info(&copied.to_string());
    record_mirror(log, opts, &copied);

    log.stage("Publishing");
    if opts.dry_run {
        log.dry_run(&format!(
            "would stage, commit \"{}\", pull --rebase and push",
            config.commit_message
        ));
        log.record_step("Publish", StepStatus::DryRun, None);
        return Ok(None);
    }

    match publish::run(vcs, &config.commit_message, log) {
        PublishOutcome::Failed(e) => {
            log.record_step("Publish", StepStatus::Failed, Some(&e.to_string()));
            Err(e.into())
        }
        outcome @ PublishOutcome::NoChanges => {
            log.record_step("Publish", StepStatus::NoChanges, Some("nothing to commit"));
            Ok(Some(outcome))
        }
        outcome @ PublishOutcome::Committed => {
            log.record_step("Publish", StepStatus::Ok, Some("committed and pushed"));
            Ok(Some(outcome))
        }
    }
}
