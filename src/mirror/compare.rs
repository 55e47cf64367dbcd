//! Up-to-date checks for destination files.
use sha2::{Digest, Sha256};
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use crate::config::CompareMode;

/// How a destination file relates to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Up to date; nothing to do.
    Current,
    /// Same bytes but a different modification time; only the time needs
    /// stamping.
    SameContent,
    /// Content differs; the file must be copied.
    Stale,
}

/// Compare `dest` against `source`.
///
/// Sizes are checked first. In [`CompareMode::Metadata`] equal mtimes mean
/// current; otherwise the digests decide, so a freshly cloned destination
/// with identical bytes is not rewritten.
///
/// `source_meta` must describe the file content (symlinks already
/// resolved); `dest_meta` must describe a regular file.
///
/// # Errors
///
/// Returns an error if a modification time or file content cannot be read.
pub fn freshness(
    mode: CompareMode,
    source: &Path,
    source_meta: &Metadata,
    dest: &Path,
    dest_meta: &Metadata,
) -> io::Result<Freshness> {
    if source_meta.len() != dest_meta.len() {
        return Ok(Freshness::Stale);
    }
    if mode == CompareMode::Metadata && source_meta.modified()? == dest_meta.modified()? {
        return Ok(Freshness::Current);
    }
    let same = digest_file(source)? == digest_file(dest)?;
    Ok(match (same, mode) {
        (false, _) => Freshness::Stale,
        (true, CompareMode::Checksum) => Freshness::Current,
        (true, CompareMode::Metadata) => Freshness::SameContent,
    })
}

/// SHA-256 digest of a file's content, streamed.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn digest_file(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().into())
}
