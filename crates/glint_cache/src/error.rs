//! Error types for cache operations.

use std::path::PathBuf;

use glint_common::FingerprintError;

/// Errors that can occur during cache operations.
///
/// Reads are fail-safe and never produce these: a missing or corrupt index
/// is an empty cache. Errors surface only from recording a build.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The index could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The source file could not be fingerprinted.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}
