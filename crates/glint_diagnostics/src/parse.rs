//! Extraction of diagnostics from raw toolchain output.
//!
//! Compiler output is scanned line by line for the clang-style shape
//! `<file>:<line>:<column>: <severity>: <message>`. Anything else (progress
//! lines, notes, linker chatter) is noise and is skipped.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Severity markers in the order they are tried at the same position.
const MARKERS: [(&str, &str); 3] = [
    (": fatal error: ", "fatal error"),
    (": error: ", "error"),
    (": warning: ", "warning"),
];

/// Parses every diagnostic line in `output`, preserving encounter order.
pub fn parse_toolchain_output(output: &str) -> Vec<Diagnostic> {
    output.lines().filter_map(parse_line).collect()
}

/// Parses a single line, returning `None` if it is not a diagnostic.
pub fn parse_line(line: &str) -> Option<Diagnostic> {
    let line = line.trim_end();

    let (pos, marker, word) = MARKERS
        .iter()
        .filter_map(|(marker, word)| line.find(marker).map(|pos| (pos, *marker, *word)))
        .min_by_key(|(pos, _, _)| *pos)?;

    let severity = Severity::from_compiler_word(word)?;
    let location = &line[..pos];
    let message = line[pos + marker.len()..].trim();

    // rsplit so drive letters in Windows paths stay part of the file name
    let mut parts = location.rsplitn(3, ':');
    let column: u32 = parts.next()?.trim().parse().ok()?;
    let line_no: u32 = parts.next()?.trim().parse().ok()?;
    let file = parts.next()?.trim();

    if file.is_empty() || line_no == 0 || column == 0 {
        return None;
    }

    Some(Diagnostic::new(severity, file, line_no, column, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_error_and_warning() {
        let output = "\
compiling...
foo.c:12:5: error: missing semicolon
bar.c:3:1: warning: unused variable
emcc: done";
        let diags = parse_toolchain_output(output);
        assert_eq!(diags.len(), 2);

        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].file, "foo.c");
        assert_eq!((diags[0].line, diags[0].column), (12, 5));
        assert_eq!(diags[0].message, "missing semicolon");

        assert_eq!(diags[1].severity, Severity::Warning);
        assert_eq!(diags[1].file, "bar.c");
        assert_eq!((diags[1].line, diags[1].column), (3, 1));
        assert_eq!(diags[1].message, "unused variable");
    }

    #[test]
    fn fatal_error_counts_as_error() {
        let diag = parse_line("ui.c:1:10: fatal error: 'lvgl.h' file not found").unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "'lvgl.h' file not found");
    }

    #[test]
    fn notes_and_noise_are_ignored() {
        assert!(parse_line("ui.c:4:2: note: previous definition is here").is_none());
        assert!(parse_line("emcc: error: no input files").is_none());
        assert!(parse_line("wasm-ld: error: undefined symbol: create_ui").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("    4 | int x").is_none());
    }

    #[test]
    fn non_numeric_location_is_ignored() {
        assert!(parse_line("foo.c:abc:5: error: nope").is_none());
        assert!(parse_line("foo.c:0:5: error: nope").is_none());
        assert!(parse_line(":12:5: error: nope").is_none());
    }

    #[test]
    fn windows_paths_keep_drive_letter() {
        let diag = parse_line(r"C:\proj\src\ui.c:7:3: warning: implicit declaration").unwrap();
        assert_eq!(diag.file, r"C:\proj\src\ui.c");
        assert_eq!((diag.line, diag.column), (7, 3));
    }

    #[test]
    fn earliest_marker_wins() {
        let diag = parse_line("a.c:2:2: warning: this is not an error: really").unwrap();
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.message, "this is not an error: really");
    }

    #[test]
    fn crlf_line_endings() {
        let diags = parse_toolchain_output("a.c:1:1: error: x\r\nb.c:2:2: warning: y\r\n");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "x");
    }
}
