//! Outcome of one mirror run.
use std::fmt;
use std::path::Path;

/// Classification of a per-item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyErrorKind {
    /// The OS refused access.
    PermissionDenied,
    /// Any other I/O failure (missing parent, disk full, path too long, ...).
    IoError,
    /// A failure that did not come from the OS.
    Other,
}

impl From<std::io::ErrorKind> for CopyErrorKind {
    fn from(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::IoError,
        }
    }
}

impl fmt::Display for CopyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PermissionDenied => "permission denied",
            Self::IoError => "I/O error",
            Self::Other => "error",
        })
    }
}

/// A recorded, non-fatal failure on a single file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyError {
    /// Failure class.
    pub kind: CopyErrorKind,
    /// Path relative to the tree root it belongs to.
    pub path: String,
    /// Human-readable detail, including the attempted operation.
    pub detail: String,
}

impl CopyError {
    /// Build a [`CopyError`] from an I/O error raised while performing `operation`.
    #[must_use]
    pub fn io(path: &Path, operation: &str, err: &std::io::Error) -> Self {
        Self {
            kind: err.kind().into(),
            path: path.display().to_string(),
            detail: format!("{operation}: {err}"),
        }
    }
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.kind, self.detail)
    }
}

/// Counts and failures produced by a mirror run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyResult {
    /// Files written to the destination (new or changed).
    pub files_copied: usize,
    /// Files already current in the destination.
    pub files_skipped: usize,
    /// Destination files removed because the source no longer has them.
    pub files_removed: usize,
    /// Source files not copied because their name is excluded.
    pub files_excluded: usize,
    /// Destination files deleted because their name is excluded.
    pub excluded_purged: usize,
    /// Destination directories created.
    pub dirs_created: usize,
    /// Destination directories removed (with their contents).
    pub dirs_removed: usize,
    /// Source symlinks (and special files) left alone.
    pub links_skipped: usize,
    /// Per-item failures.
    pub errors: Vec<CopyError>,
}

impl CopyResult {
    /// Whether the run modified (or, in dry-run, would modify) the destination.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.files_copied
            + self.files_removed
            + self.excluded_purged
            + self.dirs_created
            + self.dirs_removed
            > 0
    }

    /// Whether the recorded failures exceed `max_failures`.
    #[must_use]
    pub const fn is_fatal(&self, max_failures: usize) -> bool {
        self.errors.len() > max_failures
    }
}

impl fmt::Display for CopyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} unchanged, {} removed, {} excluded, {} purged, {} failed",
            self.files_copied,
            self.files_skipped,
            self.files_removed + self.dirs_removed,
            self.files_excluded,
            self.excluded_purged,
            self.errors.len()
        )
    }
}
