//! The final link into a web module.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glint_config::OptLevel;
use glint_diagnostics::{parse_toolchain_output, Diagnostic};
use glint_toolchain::{InvokeError, InvokeOptions, Toolchain};
use tracing::{info, warn};

use crate::error::{BuildError, Stage};
use crate::result::CompilationResult;

/// Response file listing every precompiled object, one per line.
pub const OBJECT_MANIFEST: &str = "objects.rsp";

/// Name of the JavaScript glue output; the module is written next to it.
pub const GLUE_OUTPUT: &str = "index.js";

/// Name of the web module output.
pub const MODULE_OUTPUT: &str = "index.wasm";

/// Everything one link needs.
#[derive(Debug, Clone)]
pub struct LinkRequest<'a> {
    /// The generated entry harness.
    pub main_source: &'a Path,
    /// The user's UI sources.
    pub user_sources: &'a [PathBuf],
    /// Precompiled library objects.
    pub library_objects: &'a [PathBuf],
    /// Precompiled dependency objects.
    pub dependency_objects: &'a [PathBuf],
    /// Include directories, in search order.
    pub include_paths: &'a [PathBuf],
    /// Preprocessor defines.
    pub defines: &'a [String],
    /// Driver sources compiled as part of the link.
    pub driver_sources: &'a [PathBuf],
    /// Optimization level.
    pub optimization: OptLevel,
    /// Total runtime memory in MiB.
    pub memory_budget_mb: u32,
    /// Where the manifest and outputs are written.
    pub output_dir: &'a Path,
}

/// Runs the link step.
pub struct Linker<'a> {
    toolchain: &'a dyn Toolchain,
    emcc: &'a Path,
    timeout: Duration,
    max_output_bytes: usize,
}

impl<'a> Linker<'a> {
    /// Creates a linker with the given time and output limits.
    pub fn new(
        toolchain: &'a dyn Toolchain,
        emcc: &'a Path,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            toolchain,
            emcc,
            timeout,
            max_output_bytes,
        }
    }

    /// Links everything in `req` into `index.js` + `index.wasm`.
    ///
    /// Compiler failures, timeouts included, come back as a failed result
    /// with whatever diagnostics the output held. Only an unwritable output
    /// directory or an unstartable compiler is an `Err`.
    pub fn link(&self, req: &LinkRequest<'_>) -> Result<CompilationResult, BuildError> {
        std::fs::create_dir_all(req.output_dir).map_err(|e| BuildError::io(req.output_dir, e))?;
        let manifest = req.output_dir.join(OBJECT_MANIFEST);
        write_manifest(
            &manifest,
            req.library_objects.iter().chain(req.dependency_objects),
        )?;

        let glue = req.output_dir.join(GLUE_OUTPUT);
        let module = req.output_dir.join(MODULE_OUTPUT);
        let args = link_args(req, &manifest, &glue);

        info!(
            objects = req.library_objects.len() + req.dependency_objects.len(),
            sources = req.user_sources.len() + req.driver_sources.len() + 1,
            "linking"
        );
        let options = InvokeOptions::default()
            .with_timeout(self.timeout)
            .with_max_output_bytes(self.max_output_bytes);

        let blame = req.user_sources.first().map_or(req.main_source, PathBuf::as_path);
        let result = match self.toolchain.invoke(self.emcc, &args, &options) {
            Ok(output) => CompilationResult::from_diagnostics(
                parse_toolchain_output(&output.combined()),
                Some(module),
                Some(glue),
            ),
            Err(err @ (InvokeError::Exit { .. } | InvokeError::Timeout { .. })) => {
                let mut diagnostics = err
                    .output()
                    .map(|out| parse_toolchain_output(&out.combined()))
                    .unwrap_or_default();
                if !diagnostics.iter().any(Diagnostic::is_error) {
                    diagnostics.push(Diagnostic::synthetic(blame, format!("link failed: {err}")));
                }
                CompilationResult::from_diagnostics(diagnostics, None, None)
            }
            Err(source) => {
                return Err(BuildError::Toolchain {
                    stage: Stage::Link,
                    source,
                })
            }
        };

        if result.success {
            info!(warnings = result.warnings.len(), "link succeeded");
        } else {
            warn!(errors = result.errors.len(), "link failed");
        }
        Ok(result)
    }
}

fn link_args(req: &LinkRequest<'_>, manifest: &Path, glue: &Path) -> Vec<String> {
    let mut args = vec![req.main_source.display().to_string()];
    args.extend(req.user_sources.iter().map(|p| p.display().to_string()));
    args.extend(req.driver_sources.iter().map(|p| p.display().to_string()));
    args.push(format!("@{}", manifest.display()));
    args.extend(req.include_paths.iter().map(|p| format!("-I{}", p.display())));
    args.extend(req.defines.iter().map(|d| format!("-D{d}")));
    args.push(req.optimization.as_flag().to_string());
    args.push("-sUSE_SDL=2".to_string());
    args.push(format!(
        "-sINITIAL_MEMORY={}",
        u64::from(req.memory_budget_mb) * 1024 * 1024
    ));
    args.push("-sALLOW_MEMORY_GROWTH=0".to_string());
    args.push("-o".to_string());
    args.push(glue.display().to_string());
    args
}

/// Writes one object path per line with `/` separators.
///
/// Paths containing whitespace are quoted, as response files split on it.
pub fn write_manifest<'p>(
    path: &Path,
    objects: impl IntoIterator<Item = &'p PathBuf>,
) -> Result<(), BuildError> {
    let mut content = String::new();
    for obj in objects {
        let line = obj.display().to_string().replace('\\', "/");
        if line.contains(char::is_whitespace) {
            content.push('"');
            content.push_str(&line);
            content.push('"');
        } else {
            content.push_str(&line);
        }
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|e| BuildError::io(path, e))
}
