//! The structured outcome of a build.

use std::path::PathBuf;

use glint_diagnostics::Diagnostic;
use serde::Serialize;

/// What a build produced and what the compiler said about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilationResult {
    /// `true` iff there are no error diagnostics.
    pub success: bool,
    /// The linked web module (`index.wasm`), on success.
    pub primary_artifact: Option<PathBuf>,
    /// The JavaScript glue (`index.js`), on success.
    pub glue_artifact: Option<PathBuf>,
    /// Error diagnostics in encounter order.
    pub errors: Vec<Diagnostic>,
    /// Warning diagnostics in encounter order.
    pub warnings: Vec<Diagnostic>,
}

impl CompilationResult {
    /// Splits `diagnostics` by severity and derives `success` from them.
    ///
    /// Artifact paths are only kept when the build succeeded.
    pub fn from_diagnostics(
        diagnostics: impl IntoIterator<Item = Diagnostic>,
        primary_artifact: Option<PathBuf>,
        glue_artifact: Option<PathBuf>,
    ) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            diagnostics.into_iter().partition(Diagnostic::is_error);
        let success = errors.is_empty();
        Self {
            success,
            primary_artifact: primary_artifact.filter(|_| success),
            glue_artifact: glue_artifact.filter(|_| success),
            errors,
            warnings,
        }
    }

    /// A failed result carrying a single error.
    pub fn failure(diagnostic: Diagnostic) -> Self {
        Self::from_diagnostics([diagnostic], None, None)
    }

    /// All diagnostics, errors first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }
}
