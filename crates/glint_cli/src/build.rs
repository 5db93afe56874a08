//! `glint build`: compile a UI source or its project into a web module.

use std::path::Path;

use glint_build::{BuildTarget, CompilationResult};
use glint_config::{find_project_file, resolve_project};
use glint_diagnostics::{Diagnostic, DiagnosticRenderer, TerminalRenderer};
use tracing::info;

use crate::session::Session;
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// Runs the `glint build` command.
///
/// Returns exit code 0 when the build produced a web module, 1 otherwise.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let file = std::path::absolute(&args.file)?;
    let target = resolve_target(&file)?;
    let session = Session::open(&target.base_dir(), global)?;
    let mut orchestrator = session.orchestrator()?;

    info!(main = %target.main_source().display(), "building");
    let result = orchestrator.build_project(&target);
    report(&result, args.format, global)?;
    Ok(if result.success { 0 } else { 1 })
}

/// A single-file build unless a `glint.json` is found above `file`.
pub fn resolve_target(file: &Path) -> Result<BuildTarget, glint_config::ConfigError> {
    match find_project_file(file) {
        Some(project) => {
            info!(project = %project.display(), "using project file");
            Ok(BuildTarget::Project(resolve_project(&project)?))
        }
        None => Ok(BuildTarget::SingleFile(file.to_path_buf())),
    }
}

fn report(
    result: &CompilationResult,
    format: ReportFormat,
    global: &GlobalArgs,
) -> Result<(), serde_json::Error> {
    match format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        ReportFormat::Text => eprint!("{}", render_text(result, global)),
    }
    Ok(())
}

/// Diagnostics one per line, then a summary line. `--quiet` keeps errors only.
pub fn render_text(result: &CompilationResult, global: &GlobalArgs) -> String {
    let shown: Vec<Diagnostic> = result
        .diagnostics()
        .filter(|d| d.is_error() || !global.quiet)
        .cloned()
        .collect();
    let mut out = TerminalRenderer::new(global.color).render_all(&shown);
    if !result.success {
        out.push_str(&format!(
            "error: build failed with {} error(s), {} warning(s)\n",
            result.errors.len(),
            result.warnings.len()
        ));
    } else if let (Some(module), false) = (&result.primary_artifact, global.quiet) {
        out.push_str(&format!("    Finished {}\n", module.display()));
    }
    out
}
