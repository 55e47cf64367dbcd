//! Post-copy sweep for excluded file names left in the destination.
use std::fs;
use std::path::{Path, PathBuf};

use super::apply::remove_file_forced;
use super::exclusions::Exclusions;
use super::result::{CopyError, CopyResult};
use crate::logging::Log;

/// Delete every file under `dest_root` whose base name is excluded.
///
/// Excluded directories (including `.git`) are not entered and symlinks are
/// not followed. Deletions count towards `excluded_purged`; a failed deletion
/// is recorded like any other per-item failure. Unreadable directories were
/// already reported by the planning walk and are skipped here.
pub fn purge_excluded(
    dest_root: &Path,
    exclusions: &Exclusions,
    log: &dyn Log,
    result: &mut CopyResult,
) {
    let mut pending = vec![PathBuf::new()];
    while let Some(rel) = pending.pop() {
        let entries = match fs::read_dir(dest_root.join(&rel)) {
            Ok(entries) => entries,
            Err(e) => {
                log.debug(&format!("cannot sweep {}: {e}", rel.display()));
                continue;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let child = rel.join(&name);
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if !exclusions.is_excluded_dir(&name) {
                    pending.push(child);
                }
            } else if exclusions.is_excluded_file(&name) {
                match remove_file_forced(&entry.path()) {
                    Ok(()) => {
                        log.info(&format!("purged excluded file {}", child.display()));
                        result.excluded_purged += 1;
                    }
                    Err(e) => {
                        let error = CopyError::io(&child, "purge", &e);
                        log.warn(&error.to_string());
                        result.errors.push(error);
                    }
                }
            }
        }
    }
}
