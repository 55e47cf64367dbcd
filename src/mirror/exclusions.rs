//! Name-based exclusion rules.
use std::collections::BTreeSet;
use std::ffi::OsStr;

use crate::config::SyncConfig;

/// Directory and file base names that the mirror never copies.
///
/// Matching is exact and case-sensitive on the entry's base name, at any
/// depth.  Names that are not valid UTF-8 never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    directories: BTreeSet<String>,
    files: BTreeSet<String>,
}

impl Exclusions {
    /// Build from explicit name lists.
    #[must_use]
    pub fn new<D, F>(directories: D, files: F) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            directories: directories.into_iter().map(Into::into).collect(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from the exclusion lists of a [`SyncConfig`].
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            directories: config.excluded_directory_names.clone(),
            files: config.excluded_file_names.clone(),
        }
    }

    /// Whether a directory with this base name is a don't-touch zone.
    #[must_use]
    pub fn is_excluded_dir(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| self.directories.contains(n))
    }

    /// Whether a file with this base name must never appear in the destination.
    #[must_use]
    pub fn is_excluded_file(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| self.files.contains(n))
    }
}
