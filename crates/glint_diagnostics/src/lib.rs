//! Structured compiler diagnostics.
//!
//! This crate provides the [`Diagnostic`] record surfaced by every build, a
//! line scanner that extracts diagnostics from toolchain output, and a
//! terminal renderer. JSON output goes through the record's `Serialize` impl.

#![warn(missing_docs)]

pub mod diagnostic;
pub mod parse;
pub mod renderer;
pub mod severity;

pub use diagnostic::Diagnostic;
pub use parse::{parse_line, parse_toolchain_output};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
