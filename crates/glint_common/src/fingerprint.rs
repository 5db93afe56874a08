//! File and settings fingerprints.
//!
//! `hash_file` digests full file content. `hash_settings` digests a canonical
//! serialization of the settings that affect object-file compatibility, with
//! every list-valued field sorted first so that reordering include paths or
//! defines never invalidates a cache.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FingerprintError;
use crate::hash::ContentHash;

/// Computes the content hash of a file.
pub fn hash_file(path: &Path) -> Result<ContentHash, FingerprintError> {
    let content = std::fs::read(path).map_err(|e| FingerprintError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(ContentHash::from_bytes(&content))
}

/// The settings that determine whether a compiled object can be reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsBundle {
    /// Graphics library version string.
    pub library_version: String,
    /// Optimization flag passed to the compiler.
    pub optimization: String,
    /// Library heap size in KiB.
    pub library_heap_kb: u32,
    /// Total runtime memory budget in MiB.
    pub runtime_memory_mb: u32,
    /// Include directories, in any order.
    pub include_paths: Vec<String>,
    /// Preprocessor defines, in any order.
    pub defines: Vec<String>,
    /// Display width and height, when compiled sources read them from a
    /// generated header. Left out of the digest when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<[u32; 2]>,
}

impl SettingsBundle {
    fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.include_paths.sort();
        out.defines.sort();
        out
    }
}

/// A short digest of a [`SettingsBundle`].
///
/// Only needs to avoid collisions within one machine's cache, so the 128-bit
/// XXH3 digest is used rather than a cryptographic one.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsFingerprint(String);

impl SettingsFingerprint {
    /// Returns the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SettingsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SettingsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SettingsFingerprint({})", self.0)
    }
}

impl From<&str> for SettingsFingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Computes the order-independent fingerprint of a settings bundle.
pub fn hash_settings(settings: &SettingsBundle) -> Result<SettingsFingerprint, FingerprintError> {
    let canonical =
        serde_json::to_vec(&settings.normalized()).map_err(|e| FingerprintError::Serialization {
            reason: e.to_string(),
        })?;
    let digest = xxhash_rust::xxh3::xxh3_128(&canonical);
    Ok(SettingsFingerprint(format!("{digest:032x}")))
}
