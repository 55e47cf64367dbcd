//! Planning walk: compare the two trees and decide what to change.
//!
//! The walk is depth-first and sorted by name so the plan is deterministic.
//! Nothing is written here; [`apply`](super::apply) executes the plan.
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, DirEntry, FileType, Metadata};
use std::path::{Path, PathBuf};

use super::compare::{Freshness, freshness};
use super::exclusions::Exclusions;
use super::result::{CopyError, CopyResult};
use crate::config::CompareMode;
use crate::error::MirrorError;
use crate::logging::Log;

/// Why a file is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// No file at the destination path.
    New,
    /// The destination file differs.
    Changed,
}

/// A destination entry to delete before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// An extra file (or symlink) absent from the source.
    ExtraFile(PathBuf),
    /// An extra directory absent from the source, removed recursively.
    ExtraDir(PathBuf),
    /// A file whose name is excluded.
    ExcludedFile(PathBuf),
    /// An entry whose type differs from the source entry that replaces it.
    Replaced(PathBuf),
}

impl Removal {
    /// Path relative to the destination root.
    #[must_use]
    pub fn rel(&self) -> &Path {
        match self {
            Self::ExtraFile(p) | Self::ExtraDir(p) | Self::ExcludedFile(p) | Self::Replaced(p) => {
                p
            }
        }
    }
}

/// A file to write into the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    /// Path relative to both roots.
    pub rel: PathBuf,
    /// Absolute path to read from (a symlink's resolved target when applicable).
    pub from: PathBuf,
    /// New or changed.
    pub reason: CopyReason,
}

/// A destination file with the source's bytes but a different mtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restamp {
    /// Path relative to both roots.
    pub rel: PathBuf,
    /// Absolute path whose modification time is copied.
    pub from: PathBuf,
}

/// Everything the apply phase has to do, in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Deletions, run first.
    pub removals: Vec<Removal>,
    /// Directories to create, parents before children.
    pub dirs: Vec<PathBuf>,
    /// Files to copy once every directory exists.
    pub copies: Vec<CopyJob>,
    /// Unchanged files that only need the source mtime, run last.
    pub restamps: Vec<Restamp>,
}

impl Plan {
    /// Whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
            && self.dirs.is_empty()
            && self.copies.is_empty()
            && self.restamps.is_empty()
    }
}

/// Kind of a source entry after symlink policy is applied.
enum SourceKind {
    Dir,
    File { from: PathBuf, meta: Metadata },
    Ignored(&'static str),
}

struct Planner<'a> {
    source_root: &'a Path,
    dest_root: &'a Path,
    exclusions: &'a Exclusions,
    compare: CompareMode,
    log: &'a dyn Log,
    plan: Plan,
    result: CopyResult,
}

/// Walk both trees and build the plan.
///
/// Counts that do not depend on applying (`files_skipped`, `files_excluded`,
/// `links_skipped`) and walk failures are recorded in the returned
/// [`CopyResult`].
///
/// # Errors
///
/// Returns [`MirrorError::UnreadableRoot`] if either root cannot be listed.
pub fn build(
    source_root: &Path,
    dest_root: &Path,
    exclusions: &Exclusions,
    compare: CompareMode,
    log: &dyn Log,
) -> Result<(Plan, CopyResult), MirrorError> {
    let source_entries = read_sorted(source_root).map_err(|source| MirrorError::UnreadableRoot {
        path: source_root.to_path_buf(),
        source,
    })?;
    let dest_entries = read_sorted(dest_root).map_err(|source| MirrorError::UnreadableRoot {
        path: dest_root.to_path_buf(),
        source,
    })?;

    let mut planner = Planner {
        source_root,
        dest_root,
        exclusions,
        compare,
        log,
        plan: Plan::default(),
        result: CopyResult::default(),
    };
    planner.visit(Path::new(""), source_entries, Some(dest_entries));
    Ok((planner.plan, planner.result))
}

impl Planner<'_> {
    /// Plan one directory level. `dest_entries` is `None` when the
    /// destination directory does not exist yet.
    fn visit(
        &mut self,
        rel: &Path,
        source_entries: Vec<DirEntry>,
        dest_entries: Option<Vec<DirEntry>>,
    ) {
        let mut handled: HashSet<OsString> = HashSet::new();

        for entry in source_entries {
            let name = entry.file_name();
            let child_rel = rel.join(&name);
            let kind = match self.classify(&entry, &child_rel) {
                Ok(kind) => kind,
                Err(e) => {
                    self.record(CopyError::io(&child_rel, "inspect source", &e));
                    handled.insert(name);
                    continue;
                }
            };

            match kind {
                SourceKind::Dir if self.exclusions.is_excluded_dir(&name) => {
                    self.log
                        .debug(&format!("excluded directory: {}", child_rel.display()));
                    handled.insert(name);
                }
                SourceKind::Dir => {
                    handled.insert(name);
                    self.plan_dir(&child_rel, &entry.path());
                }
                SourceKind::File { .. } if self.exclusions.is_excluded_file(&name) => {
                    self.log
                        .debug(&format!("excluded file: {}", child_rel.display()));
                    self.result.files_excluded += 1;
                }
                SourceKind::File { from, meta } => {
                    handled.insert(name);
                    self.plan_file(child_rel, from, &meta);
                }
                SourceKind::Ignored(why) => {
                    self.log
                        .warn(&format!("skipping {}: {why}", child_rel.display()));
                    self.result.links_skipped += 1;
                    handled.insert(name);
                }
            }
        }

        for entry in dest_entries.into_iter().flatten() {
            let name = entry.file_name();
            if handled.contains(&name) {
                continue;
            }
            let child_rel = rel.join(&name);
            let is_dir = match entry.file_type() {
                Ok(t) => t.is_dir(),
                Err(e) => {
                    self.record(CopyError::io(&child_rel, "inspect destination", &e));
                    continue;
                }
            };
            if is_dir {
                if self.exclusions.is_excluded_dir(&name) {
                    continue;
                }
                self.plan.removals.push(Removal::ExtraDir(child_rel));
            } else if self.exclusions.is_excluded_file(&name) {
                self.plan.removals.push(Removal::ExcludedFile(child_rel));
            } else {
                self.plan.removals.push(Removal::ExtraFile(child_rel));
            }
        }
    }

    fn classify(&self, entry: &DirEntry, rel: &Path) -> std::io::Result<SourceKind> {
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            return Ok(SourceKind::Dir);
        }
        if file_type.is_file() {
            return Ok(SourceKind::File {
                from: entry.path(),
                meta: entry.metadata()?,
            });
        }
        if file_type.is_symlink() {
            return Ok(self.classify_link(&entry.path(), rel));
        }
        Ok(SourceKind::Ignored("not a regular file"))
    }

    /// Links are never traversed; a link to a regular file inside the source
    /// root is mirrored as a copy of that file.
    fn classify_link(&self, path: &Path, rel: &Path) -> SourceKind {
        let Ok(target) = dunce::canonicalize(path) else {
            return SourceKind::Ignored("broken symlink");
        };
        let Ok(inside) = target.strip_prefix(self.source_root) else {
            return SourceKind::Ignored("symlink points outside the source tree");
        };
        if self.targets_excluded(inside) {
            return SourceKind::Ignored("symlink points at an excluded path");
        }
        match fs::metadata(&target) {
            Ok(meta) if meta.is_file() => {
                self.log.debug(&format!(
                    "following file symlink {} -> {}",
                    rel.display(),
                    target.display()
                ));
                SourceKind::File { from: target, meta }
            }
            Ok(_) => SourceKind::Ignored("symlink to a directory"),
            Err(_) => SourceKind::Ignored("unreadable symlink target"),
        }
    }

    /// Whether a link target (relative to the source root) is excluded by
    /// its own name or lies under an excluded directory.
    fn targets_excluded(&self, inside: &Path) -> bool {
        let Some(name) = inside.file_name() else {
            return false;
        };
        self.exclusions.is_excluded_file(name)
            || inside
                .parent()
                .into_iter()
                .flat_map(Path::components)
                .any(|c| self.exclusions.is_excluded_dir(c.as_os_str()))
    }

    fn plan_dir(&mut self, rel: &Path, source_dir: &Path) {
        // An unreadable source directory leaves its destination untouched.
        let source_entries = match read_sorted(source_dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.record(CopyError::io(rel, "read source directory", &e));
                return;
            }
        };

        let dest_dir = self.dest_root.join(rel);
        let dest_entries = match dest_type(&dest_dir) {
            Ok(Some(t)) if t.is_dir() => match read_sorted(&dest_dir) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    self.record(CopyError::io(rel, "read destination directory", &e));
                    return;
                }
            },
            Ok(Some(_)) => {
                self.plan.removals.push(Removal::Replaced(rel.to_path_buf()));
                self.plan.dirs.push(rel.to_path_buf());
                None
            }
            Ok(None) => {
                self.plan.dirs.push(rel.to_path_buf());
                None
            }
            Err(e) => {
                self.record(CopyError::io(rel, "inspect destination", &e));
                return;
            }
        };

        self.visit(rel, source_entries, dest_entries);
    }

    fn plan_file(&mut self, rel: PathBuf, from: PathBuf, source_meta: &Metadata) {
        let dest = self.dest_root.join(&rel);
        let reason = match fs::symlink_metadata(&dest) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CopyReason::New,
            Err(e) => {
                self.record(CopyError::io(&rel, "inspect destination", &e));
                return;
            }
            Ok(meta) if meta.is_dir() && self.is_excluded_dir_name(&rel) => {
                self.log.warn(&format!(
                    "skipping {}: destination holds an excluded directory of that name",
                    rel.display()
                ));
                return;
            }
            Ok(meta) if !meta.file_type().is_file() => {
                self.plan.removals.push(Removal::Replaced(rel.clone()));
                CopyReason::New
            }
            Ok(meta) => match freshness(self.compare, &from, source_meta, &dest, &meta) {
                Ok(Freshness::Current) => {
                    self.result.files_skipped += 1;
                    return;
                }
                Ok(Freshness::SameContent) => {
                    self.result.files_skipped += 1;
                    self.plan.restamps.push(Restamp { rel, from });
                    return;
                }
                Ok(Freshness::Stale) => CopyReason::Changed,
                Err(e) => {
                    self.record(CopyError::io(&rel, "compare", &e));
                    return;
                }
            },
        };
        self.plan.copies.push(CopyJob { rel, from, reason });
    }

    fn is_excluded_dir_name(&self, rel: &Path) -> bool {
        rel.file_name()
            .is_some_and(|name| self.exclusions.is_excluded_dir(name))
    }

    fn record(&mut self, error: CopyError) {
        self.log.warn(&error.to_string());
        self.result.errors.push(error);
    }
}

/// List a directory sorted by entry name.
fn read_sorted(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(DirEntry::file_name);
    Ok(entries)
}

/// File type of `path` without following symlinks; `None` if absent.
fn dest_type(path: &Path) -> std::io::Result<Option<FileType>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta.file_type())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
