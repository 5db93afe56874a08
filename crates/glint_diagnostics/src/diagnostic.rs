//! Structured diagnostic messages anchored to a file location.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A compiler diagnostic with a 1-based source location.
///
/// Diagnostics either come from parsing toolchain output or are synthesized
/// by the build orchestrator for failures that have no source location, in
/// which case they point at line 1, column 1 of the main source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The file the diagnostic refers to, as reported by the compiler.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// The severity level.
    pub severity: Severity,
    /// The human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic, clamping line and column to at least 1.
    pub fn new(
        severity: Severity,
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line: line.max(1),
            column: column.max(1),
            severity,
            message: message.into(),
        }
    }

    /// Creates an error diagnostic.
    pub fn error(file: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, file, line, column, message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, file, line, column, message)
    }

    /// Creates an error at the start of `file` for failures with no source location.
    pub fn synthetic(file: &Path, message: impl Into<String>) -> Self {
        Self::error(file.display().to_string(), 1, 1, message)
    }

    /// Returns `true` if this is an error.
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.line, self.column, self.severity, self.message
        )
    }
}
