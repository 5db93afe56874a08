//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating settings and project files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading a configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The file content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A path named by the configuration does not exist.
    #[error("{what} not found: {}", path.display())]
    MissingPath {
        /// What the path was supposed to be (e.g. "dependency source").
        what: &'static str,
        /// The resolved absolute path.
        path: PathBuf,
    },

    /// The runtime memory budget cannot hold the library heap plus overhead.
    #[error(
        "runtime memory budget of {runtime_mb} MB is too small: the library heap needs \
         {heap_mb} MB plus {overhead_mb} MB of runtime overhead ({required_mb} MB total)"
    )]
    MemoryBudget {
        /// The configured runtime budget in MiB.
        runtime_mb: u32,
        /// The library heap rounded up to whole MiB.
        heap_mb: u32,
        /// The fixed runtime overhead in MiB.
        overhead_mb: u32,
        /// The minimum acceptable runtime budget in MiB.
        required_mb: u32,
    },

    /// The library version is malformed or its major version is not supported.
    #[error("unsupported library version '{0}'")]
    UnsupportedVersion(String),
}
