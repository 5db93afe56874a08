//! A single cache record.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use glint_common::{ContentHash, SettingsFingerprint};
use serde::{Deserialize, Serialize};

/// Cached state for one compiled source file.
///
/// Entries are replaced whole after every recompilation and are never
/// removed individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The source file, as passed to the compiler.
    pub source: PathBuf,
    /// The object file the compiler produced.
    pub artifact: PathBuf,
    /// Content hash of the source at compile time.
    pub content_hash: ContentHash,
    /// Source modification time at compile time, in milliseconds since the epoch.
    pub mtime_ms: u64,
    /// Settings the object was compiled under.
    ///
    /// Indexes written before fingerprints existed lack this field; such
    /// entries skip the settings comparison instead of being invalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_fingerprint: Option<SettingsFingerprint>,
}

/// Reads a file's modification time in milliseconds since the epoch.
pub fn modified_ms(path: &Path) -> std::io::Result<u64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(std::io::Error::other)?;
    Ok(u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX))
}
