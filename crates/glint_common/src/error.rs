//! Error types for fingerprint computation.

use std::path::PathBuf;

/// Errors that can occur while computing fingerprints.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// The file to hash could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The settings bundle could not be serialized into its canonical form.
    #[error("failed to serialize settings: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = FingerprintError::Io {
            path: PathBuf::from("/src/main.c"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to read"));
        assert!(msg.contains("main.c"));
    }

    #[test]
    fn serialization_display() {
        let err = FingerprintError::Serialization {
            reason: "bad float".to_string(),
        };
        assert_eq!(err.to_string(), "failed to serialize settings: bad float");
    }
}
