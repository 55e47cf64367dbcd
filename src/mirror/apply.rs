//! Apply phase: execute a [`Plan`] against the destination tree.
use std::fs;
use std::io;
use std::path::Path;

use super::plan::{CopyJob, CopyReason, Plan, Removal, Restamp};
use super::result::{CopyError, CopyResult};
use crate::logging::Log;

/// Execute `plan` under `dest_root`, accumulating counts into `result`.
///
/// Removals run first, then directory creation (parents first), then copies,
/// then mtime stamps on files whose bytes already matched. A failed item is
/// recorded and the rest of the plan still runs. In dry-run mode nothing is
/// written and the counts describe what would happen.
pub fn apply(
    plan: &Plan,
    dest_root: &Path,
    dry_run: bool,
    parallel: bool,
    log: &dyn Log,
    result: &mut CopyResult,
) {
    for removal in &plan.removals {
        remove(removal, dest_root, dry_run, log, result);
    }

    for rel in &plan.dirs {
        if dry_run {
            log.dry_run(&format!("would create directory {}", rel.display()));
            result.dirs_created += 1;
            continue;
        }
        match fs::create_dir(dest_root.join(rel)) {
            Ok(()) => {
                log.debug(&format!("created directory {}", rel.display()));
                result.dirs_created += 1;
            }
            Err(e) => record(result, log, CopyError::io(rel, "create directory", &e)),
        }
    }

    if dry_run {
        for job in &plan.copies {
            let verb = match job.reason {
                CopyReason::New => "would copy",
                CopyReason::Changed => "would update",
            };
            log.dry_run(&format!("{verb} {}", job.rel.display()));
        }
        result.files_copied += plan.copies.len();
        return;
    }

    let outcomes: Vec<Result<(), CopyError>> = if parallel {
        use rayon::prelude::*;
        plan.copies
            .par_iter()
            .map(|job| copy_one(job, dest_root, log))
            .collect()
    } else {
        plan.copies
            .iter()
            .map(|job| copy_one(job, dest_root, log))
            .collect()
    };

    for outcome in outcomes {
        match outcome {
            Ok(()) => result.files_copied += 1,
            Err(e) => record(result, log, e),
        }
    }

    for restamp in &plan.restamps {
        restamp_one(restamp, dest_root, log);
    }
}

/// Copy the source mtime onto an identical destination file. Failures are
/// logged, not counted.
fn restamp_one(restamp: &Restamp, dest_root: &Path, log: &dyn Log) {
    let stamped = fs::metadata(&restamp.from)
        .and_then(|m| m.modified())
        .and_then(|time| set_modified(&dest_root.join(&restamp.rel), time));
    match stamped {
        Ok(()) => log.debug(&format!("restamped {}", restamp.rel.display())),
        Err(e) => log.warn(&format!(
            "cannot set modification time on {}: {e}",
            restamp.rel.display()
        )),
    }
}

fn remove(
    removal: &Removal,
    dest_root: &Path,
    dry_run: bool,
    log: &dyn Log,
    result: &mut CopyResult,
) {
    let rel = removal.rel();
    let path = dest_root.join(rel);
    let is_dir = match fs::symlink_metadata(&path) {
        Ok(meta) => meta.is_dir(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            record(result, log, CopyError::io(rel, "inspect destination", &e));
            return;
        }
    };

    let what = match removal {
        Removal::ExcludedFile(_) => "excluded file",
        Removal::ExtraDir(_) => "directory",
        Removal::ExtraFile(_) => "file",
        Removal::Replaced(_) if is_dir => "directory replaced by a file",
        Removal::Replaced(_) => "file replaced by a directory",
    };

    if dry_run {
        log.dry_run(&format!("would remove {what} {}", rel.display()));
    } else {
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            remove_file_forced(&path)
        };
        if let Err(e) = removed {
            record(result, log, CopyError::io(rel, "remove", &e));
            return;
        }
        log.debug(&format!("removed {what} {}", rel.display()));
    }

    match removal {
        Removal::ExcludedFile(_) => result.excluded_purged += 1,
        _ if is_dir => result.dirs_removed += 1,
        _ => result.files_removed += 1,
    }
}

/// Copy one file and stamp the source modification time on the copy.
fn copy_one(job: &CopyJob, dest_root: &Path, log: &dyn Log) -> Result<(), CopyError> {
    let dest = dest_root.join(&job.rel);
    let err = |op: &str, e: &io::Error| CopyError::io(&job.rel, op, e);

    let modified = fs::metadata(&job.from)
        .and_then(|m| m.modified())
        .map_err(|e| err("read source", &e))?;

    clear_readonly(&dest).map_err(|e| err("make writable", &e))?;
    fs::copy(&job.from, &dest).map_err(|e| err("copy", &e))?;
    set_modified(&dest, modified).map_err(|e| err("set modification time", &e))?;

    let verb = match job.reason {
        CopyReason::New => "copied",
        CopyReason::Changed => "updated",
    };
    log.debug(&format!("{verb} {}", job.rel.display()));
    Ok(())
}

/// Remove a file, clearing the read-only attribute first if needed.
pub(super) fn remove_file_forced(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            clear_readonly(path)?;
            fs::remove_file(path)
        }
        other => other,
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let mut perms = meta.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_modified(path: &Path, time: std::time::SystemTime) -> io::Result<()> {
    fs::File::open(path)?.set_modified(time)
}

#[cfg(windows)]
fn set_modified(path: &Path, time: std::time::SystemTime) -> io::Result<()> {
    use std::os::windows::fs::OpenOptionsExt as _;
    const FILE_WRITE_ATTRIBUTES: u32 = 0x100;
    fs::OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(path)?
        .set_modified(time)
}

fn record(result: &mut CopyResult, log: &dyn Log, error: CopyError) {
    log.warn(&error.to_string());
    result.errors.push(error);
}
