//! TOML config file parsing.
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use super::CompareMode;
use crate::error::ConfigError;

/// On-disk shape of `repo-mirror.toml`.
///
/// Every field is optional; unset fields fall through to environment
/// variables and built-in defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory to mirror from.
    pub source: Option<PathBuf>,
    /// Directory to mirror into.
    pub destination: Option<PathBuf>,
    /// Commit message for the publish commit.
    pub commit_message: Option<String>,
    /// File comparison strategy.
    pub compare: Option<CompareMode>,
    /// Per-file failures tolerated before the run is aborted.
    pub max_copy_failures: Option<usize>,
    /// Remote to pull from and push to.
    pub remote: Option<String>,
    /// Branch to publish.
    pub branch: Option<String>,
    /// Exclusion lists.
    pub exclude: ExcludeSection,
}

/// The `[exclude]` table.
///
/// `directories`/`files` replace the built-in lists; the `extra_` variants
/// extend them.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExcludeSection {
    /// Replacement list of excluded directory names.
    pub directories: Option<Vec<String>>,
    /// Replacement list of excluded file names.
    pub files: Option<Vec<String>>,
    /// Directory names added to the active list.
    pub extra_directories: Vec<String>,
    /// File names added to the active list.
    pub extra_files: Vec<String>,
}

/// Deserialize a TOML file.
///
/// A missing file deserializes as empty TOML so optional config files need
/// no special casing by callers.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = if path.exists() {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?
    } else {
        String::new()
    };

    toml::from_str(&content).map_err(|e| ConfigError::InvalidFile {
        path: path.display().to_string(),
        message: e.message().to_string(),
    })
}

/// Load a [`FileConfig`], resolving relative paths against the file's directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let mut config: FileConfig = load_config(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.source = config.source.map(|p| base.join(p));
    config.destination = config.destination.map(|p| base.join(p));
    Ok(config)
}
