//! The toolchain seam consumed by every build stage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::InvokeError;

/// Default cap on captured bytes per stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Per-invocation process options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Working directory for the child process; inherits the caller's when `None`.
    pub cwd: Option<PathBuf>,
    /// Wall-clock limit; unlimited when `None`.
    pub timeout: Option<Duration>,
    /// Maximum captured bytes of each of stdout and stderr. Excess is discarded.
    pub max_output_bytes: usize,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl InvokeOptions {
    /// Sets the working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the output cap.
    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }
}

/// Captured output of a toolchain run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl InvokeOutput {
    /// Stdout followed by stderr, for diagnostic scanning.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => {
                let mut out = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
                out.push_str(&self.stdout);
                if !self.stdout.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&self.stderr);
                out
            }
        }
    }
}

/// Runs the C-to-web compiler.
///
/// Implementations must return `InvokeError::Exit` or `InvokeError::Timeout`
/// with whatever output was captured when the process fails, so callers can
/// still extract diagnostics from it.
pub trait Toolchain: Send + Sync {
    /// Runs `program` with `args` and returns its output on success.
    fn invoke(
        &self,
        program: &Path,
        args: &[String],
        options: &InvokeOptions,
    ) -> Result<InvokeOutput, InvokeError>;
}
