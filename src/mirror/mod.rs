//! Mirror engine: make the destination tree match the source tree.
//!
//! A run is a sequential planning walk ([`plan::build`]), an apply phase
//! ([`apply::apply`]) and a sweep that deletes any excluded file name still
//! present in the destination ([`cleanup::purge_excluded`]). Excluded
//! directories are never entered on either side, so the destination's `.git`
//! is never read or written.
pub mod apply;
pub mod cleanup;
pub mod compare;
pub mod exclusions;
pub mod plan;
pub mod result;

pub use exclusions::Exclusions;
pub use result::{CopyError, CopyErrorKind, CopyResult};

use crate::config::SyncConfig;
use crate::error::MirrorError;
use crate::logging::Log;

/// Runtime switches for a mirror run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Plan and report without writing.
    pub dry_run: bool,
    /// Copy files on the rayon pool.
    pub parallel: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            parallel: true,
        }
    }
}

/// Mirror `config.source_path` into `config.destination_path`.
///
/// Per-file failures do not stop the run; they are collected in the returned
/// [`CopyResult`]. Once the run completes, more than
/// `config.max_copy_failures` of them is fatal.
///
/// # Errors
///
/// Returns [`MirrorError::UnreadableRoot`] if either root cannot be listed,
/// or [`MirrorError::TooManyFailures`] past the failure threshold.
pub fn run(
    config: &SyncConfig,
    opts: &MirrorOptions,
    log: &dyn Log,
) -> Result<CopyResult, MirrorError> {
    let exclusions = Exclusions::from_config(config);
    log.debug(&format!(
        "mirroring {} -> {} (compare: {:?})",
        config.source_path.display(),
        config.destination_path.display(),
        config.compare
    ));

    let (plan, mut result) = plan::build(
        &config.source_path,
        &config.destination_path,
        &exclusions,
        config.compare,
        log,
    )?;
    log.debug(&format!(
        "plan: {} removal(s), {} director(ies), {} cop(ies)",
        plan.removals.len(),
        plan.dirs.len(),
        plan.copies.len()
    ));

    apply::apply(
        &plan,
        &config.destination_path,
        opts.dry_run,
        opts.parallel,
        log,
        &mut result,
    );

    if !opts.dry_run {
        cleanup::purge_excluded(&config.destination_path, &exclusions, log, &mut result);
    }

    if result.is_fatal(config.max_copy_failures) {
        return Err(MirrorError::TooManyFailures {
            failures: result.errors.len(),
            allowed: config.max_copy_failures,
        });
    }
    Ok(result)
}
