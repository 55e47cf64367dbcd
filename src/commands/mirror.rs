//! Command: mirror only, no version control.
use anyhow::Result;

use super::{load_config, mirror_options, record_mirror};
use crate::cli::GlobalOpts;
use crate::logging::{Logger, StepStatus};
use crate::mirror;

/// Run the mirror command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the mirror fails fatally.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    log.info(&format!("repo-mirror {}", super::version::version()));
    let config = load_config(global, log)?;
    let opts = mirror_options(global);

    log.stage("Mirroring");
    let outcome = mirror::run(&config, &opts, log);
    match &outcome {
        Ok(copied) => {
            log.info(&copied.to_string());
            record_mirror(log, &opts, copied);
        }
        Err(e) => {
            log.error(&e.to_string());
            log.record_step("Mirror", StepStatus::Failed, Some(&e.to_string()));
        }
    }
    log.print_summary();
    outcome?;
    Ok(())
}
