pub mod mirror;
pub mod sync;
pub mod version;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::SyncConfig;
use crate::logging::{Log, StepStatus};
use crate::mirror::{CopyResult, MirrorOptions};

/// Resolve configuration from flags, environment and config file, then
/// validate both roots.
///
/// # Errors
///
/// Returns an error if the current directory is unavailable or the
/// configuration is incomplete or invalid.
pub fn load_config(global: &GlobalOpts, log: &dyn Log) -> Result<SyncConfig> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;

    log.stage("Loading configuration");
    let config = SyncConfig::resolve(&global.overrides(), |key| std::env::var(key).ok(), &cwd)?
        .validate()?;

    log.info(&format!("source: {}", config.source_path.display()));
    log.info(&format!("destination: {}", config.destination_path.display()));
    log.debug(&format!(
        "excluded directories: {}",
        config
            .excluded_directory_names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    ));
    log.debug(&format!(
        "excluded files: {}",
        config
            .excluded_file_names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    ));
    Ok(config)
}

/// Mirror options from the global flags.
#[must_use]
pub const fn mirror_options(global: &GlobalOpts) -> MirrorOptions {
    MirrorOptions {
        dry_run: global.dry_run,
        parallel: global.parallel,
    }
}

/// Record the mirror step for the summary.
fn record_mirror(log: &dyn Log, opts: &MirrorOptions, result: &CopyResult) {
    let status = if opts.dry_run {
        StepStatus::DryRun
    } else if result.has_changes() {
        StepStatus::Ok
    } else {
        StepStatus::NoChanges
    };
    log.record_step("Mirror", status, Some(&result.to_string()));
}
