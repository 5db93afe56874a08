//! Rendering diagnostics for the terminal.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders a list of diagnostics, one per line.
    fn render_all(&self, diags: &[Diagnostic]) -> String {
        let mut out = String::new();
        for diag in diags {
            out.push_str(&self.render(diag));
            out.push('\n');
        }
        out
    }
}

/// Renders diagnostics in the compiler's own `file:line:col: severity: message` shape.
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        if !self.color {
            return diag.to_string();
        }
        let code = if diag.is_error() { "31" } else { "33" };
        format!(
            "{}:{}:{}: \x1b[1;{code}m{}\x1b[0m: {}",
            diag.file, diag.line, diag.column, diag.severity, diag.message
        )
    }
}
