//! Error types for the build stages.

use std::fmt;
use std::path::PathBuf;

use glint_cache::CacheError;
use glint_common::FingerprintError;
use glint_config::ConfigError;
use glint_toolchain::InvokeError;

/// The pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Graphics library compilation.
    Library,
    /// Project dependency compilation.
    Dependencies,
    /// Final link.
    Link,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Library => "library",
            Stage::Dependencies => "dependency",
            Stage::Link => "link",
        })
    }
}

/// Errors that abort a build before a structured result can be produced.
///
/// The orchestrator converts every variant into a failed
/// [`CompilationResult`](crate::CompilationResult); nothing escapes it.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Settings or project configuration are unusable.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// A file or directory could not be read or written.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A stage finished but produced nothing usable.
    #[error("{stage} build failed: {message}")]
    BuildFailure {
        /// The failing stage.
        stage: Stage,
        /// What went wrong.
        message: String,
    },

    /// The compiler could not be run, or failed where failure is fatal.
    #[error("{stage} compilation failed: {source}")]
    Toolchain {
        /// The failing stage.
        stage: Stage,
        /// The invocation error, carrying any captured output.
        source: InvokeError,
    },

    /// The object cache could not record a build.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Settings could not be fingerprinted.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}
