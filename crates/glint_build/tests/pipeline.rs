//! Integration tests for the full build pipeline on on-disk projects.
//!
//! These tests drive the orchestrator from real `glint.toml` / `glint.json`
//! files against a fake compiler that records its invocations and writes the
//! outputs a real one would.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use glint_build::{BuildTarget, LocalSources, Orchestrator, COMPLETE_MARKER};
use glint_config::{find_project_file, load_settings, resolve_project};
use glint_toolchain::{InvokeError, InvokeOptions, InvokeOutput, Toolchain};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helper: a recording compiler
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingEmcc {
    calls: Mutex<Vec<Vec<String>>>,
    link_stderr: String,
    broken: Option<String>,
}

impl RecordingEmcc {
    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn compile_calls(&self) -> Vec<Vec<String>> {
        self.calls().into_iter().filter(|c| !is_link(c)).collect()
    }

    fn last_link(&self) -> Vec<String> {
        self.calls().into_iter().rev().find(|c| is_link(c)).unwrap()
    }
}

fn is_link(args: &[String]) -> bool {
    args.iter().any(|a| a.ends_with("index.js"))
}

impl Toolchain for RecordingEmcc {
    fn invoke(
        &self,
        program: &Path,
        args: &[String],
        options: &InvokeOptions,
    ) -> Result<InvokeOutput, InvokeError> {
        self.calls.lock().unwrap().push(args.to_vec());

        let broken = self
            .broken
            .as_deref()
            .and_then(|pat| args.iter().find(|a| a.ends_with(".c") && a.contains(pat)));
        if let Some(src) = broken {
            return Err(InvokeError::Exit {
                program: program.to_path_buf(),
                code: Some(1),
                output: InvokeOutput {
                    stdout: String::new(),
                    stderr: format!("{src}:4:9: error: use of undeclared identifier 'lv_foo'\n"),
                },
            });
        }

        if let Some(i) = args.iter().position(|a| a == "-o") {
            let out = PathBuf::from(&args[i + 1]);
            fs::write(&out, "obj").unwrap();
            if is_link(args) {
                fs::write(out.with_extension("wasm"), "\0asm").unwrap();
                return Ok(InvokeOutput {
                    stdout: String::new(),
                    stderr: self.link_stderr.clone(),
                });
            }
        } else {
            let cwd = options.cwd.clone().unwrap();
            for src in args.iter().filter(|a| a.ends_with(".c")) {
                let stem = Path::new(src).file_stem().unwrap().to_string_lossy();
                fs::write(cwd.join(format!("{stem}.o")), "obj").unwrap();
            }
        }
        Ok(InvokeOutput::default())
    }
}

// ---------------------------------------------------------------------------
// Helper: on-disk workspace
// ---------------------------------------------------------------------------

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Lays out library sources for both major versions plus the driver package.
fn sources(root: &Path) {
    for rel in [
        "sources/lvgl-9.2.0/lvgl.h",
        "sources/lvgl-9.2.0/src/core/lv_obj.c",
        "sources/lvgl-9.2.0/src/misc/lv_area.c",
        "sources/lvgl-9.2.0/src/drivers/sdl/lv_sdl_window.c",
        "sources/lvgl-9.2.0/src/drivers/sdl/lv_sdl_mouse.c",
        "sources/lvgl-8.3.11/lvgl.h",
        "sources/lvgl-8.3.11/src/core/lv_obj.c",
        "sources/lvgl-8.3.11/src/hal/lv_hal_disp.c",
        "sources/lv_drivers/sdl/sdl.c",
        "sources/lv_drivers/sdl/sdl_common.c",
    ] {
        write(root, rel, "/* library */");
    }
}

fn project(root: &Path, toml: &str) -> BuildTarget {
    sources(root);
    write(root, "glint.toml", toml);
    write(root, "src/ui.c", "void create_ui(void) {}");
    write(root, "src/widgets.c", "int widgets;");
    write(root, "src/theme.c", "int theme;");
    fs::create_dir_all(root.join("include")).unwrap();
    write(
        root,
        "glint.json",
        r#"{
            "main": "src/ui.c",
            "dependencies": ["src/widgets.c", "src/theme.c"],
            "includePaths": ["include"],
            "defines": ["APP_NAME=\"demo\""]
        }"#,
    );
    let found = find_project_file(&root.join("src/ui.c")).unwrap();
    BuildTarget::Project(resolve_project(&found).unwrap())
}

fn session<'a>(root: &Path, emcc: &'a RecordingEmcc, sources: &'a LocalSources) -> Orchestrator<'a> {
    let settings = load_settings(root).unwrap();
    let cache = root.join(&settings.cache.dir);
    Orchestrator::new(settings, emcc, sources, cache).unwrap()
}

const V9: &str = r#"
[library]
version = "9.2.0"
sources = "sources"
"#;

const V8: &str = r#"
[library]
version = "8.3.11"
sources = "sources"

[display]
width = 800
height = 480
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn project_builds_end_to_end() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V9);
    let srcs = LocalSources::new(dir.path().join("sources"));
    let emcc = RecordingEmcc::default();
    let mut orch = session(dir.path(), &emcc, &srcs);

    let result = orch.build_project(&target);
    assert!(result.success, "{result:?}");
    assert!(result.primary_artifact.as_ref().unwrap().is_file());
    assert!(result.glue_artifact.as_ref().unwrap().is_file());

    // Two library sources (SDL excluded), one dependency batch, one link.
    assert_eq!(emcc.calls().len(), 4);
    let link = emcc.last_link();
    assert!(link.iter().any(|a| a.ends_with("lv_sdl_window.c")));
    assert!(link.iter().any(|a| a.ends_with("lv_sdl_mouse.c")));
    assert!(link.contains(&"-DAPP_NAME=\"demo\"".to_string()));
    let include = fs::canonicalize(dir.path()).unwrap().join("include");
    assert!(link.contains(&format!("-I{}", include.display())));
}

#[test]
fn second_session_only_links() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V9);
    let srcs = LocalSources::new(dir.path().join("sources"));

    let first = RecordingEmcc::default();
    assert!(session(dir.path(), &first, &srcs).build_project(&target).success);

    let second = RecordingEmcc::default();
    let result = session(dir.path(), &second, &srcs).build_project(&target);
    assert!(result.success);
    assert_eq!(second.calls().len(), 1);
    assert!(is_link(&second.calls()[0]));
}

#[test]
fn editing_one_dependency_recompiles_only_it() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V9);
    let srcs = LocalSources::new(dir.path().join("sources"));
    let emcc = RecordingEmcc::default();
    let mut orch = session(dir.path(), &emcc, &srcs);
    assert!(orch.build_project(&target).success);
    let before = emcc.compile_calls().len();

    write(dir.path(), "src/theme.c", "int theme = 2;");
    assert!(orch.build_project(&target).success);

    let compiles = emcc.compile_calls();
    assert_eq!(compiles.len(), before + 1);
    let recompiled: Vec<&String> = compiles
        .last()
        .unwrap()
        .iter()
        .filter(|a| a.ends_with(".c"))
        .collect();
    assert_eq!(recompiled.len(), 1);
    assert!(recompiled[0].ends_with("theme.c"));
}

#[test]
fn legacy_profile_uses_driver_package() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V8);
    let srcs = LocalSources::new(dir.path().join("sources"));
    let emcc = RecordingEmcc::default();
    let mut orch = session(dir.path(), &emcc, &srcs);

    let key = orch.library_key().unwrap();
    assert_eq!(key, "8.3.11_O2_800x480_mem256k32m_drv_s2");

    let result = orch.build_project(&target);
    assert!(result.success, "{result:?}");

    let drivers = dir.path().join("sources/lv_drivers");
    assert!(drivers.join("lvgl/lvgl.h").is_file());
    let drv_conf = fs::read_to_string(drivers.join("lv_drv_conf.h")).unwrap();
    assert!(drv_conf.contains("#define SDL_HOR_RES 800"));
    assert!(drv_conf.contains("#define SDL_VER_RES 480"));

    let link = emcc.last_link();
    assert!(link.iter().any(|a| a.ends_with("sdl/sdl.c")));
    assert!(link.iter().any(|a| a.ends_with("sdl/sdl_common.c")));
    assert!(link.contains(&"-DLV_LVGL_H_INCLUDE_SIMPLE".to_string()));

    let marker = dir.path().join(".glint-cache/lib").join(&key).join(COMPLETE_MARKER);
    assert!(marker.is_file());
}

#[test]
fn switching_major_version_builds_separate_library() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V9);
    let srcs = LocalSources::new(dir.path().join("sources"));
    let emcc = RecordingEmcc::default();
    assert!(session(dir.path(), &emcc, &srcs).build_project(&target).success);

    write(dir.path(), "glint.toml", V8);
    let emcc = RecordingEmcc::default();
    let mut orch = session(dir.path(), &emcc, &srcs);
    assert!(orch.build_project(&target).success);

    // Both library sources of 8.3.11 and both dependencies are rebuilt.
    let compiled: usize = emcc
        .compile_calls()
        .iter()
        .map(|c| c.iter().filter(|a| a.ends_with(".c")).count())
        .sum();
    assert_eq!(compiled, 4);
    assert_eq!(fs::read_dir(dir.path().join(".glint-cache/lib")).unwrap().count(), 2);
}

#[test]
fn link_warnings_are_reported_on_success() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V9);
    let srcs = LocalSources::new(dir.path().join("sources"));
    let emcc = RecordingEmcc {
        link_stderr: "src/ui.c:7:3: warning: unused variable 'btn'\nemcc: linking\n".to_string(),
        ..RecordingEmcc::default()
    };

    let result = session(dir.path(), &emcc, &srcs).build_project(&target);
    assert!(result.success);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].line, 7);
    assert_eq!(result.warnings[0].column, 3);
}

#[test]
fn user_error_fails_with_located_diagnostic() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V9);
    let srcs = LocalSources::new(dir.path().join("sources"));
    let emcc = RecordingEmcc {
        broken: Some("ui.c".to_string()),
        ..RecordingEmcc::default()
    };

    let result = session(dir.path(), &emcc, &srcs).build_project(&target);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    let err = &result.errors[0];
    assert!(err.file.ends_with("ui.c"));
    assert_eq!((err.line, err.column), (4, 9));
    assert!(result.primary_artifact.is_none());
}

#[test]
fn too_small_memory_budget_fails_before_compiling() {
    let dir = TempDir::new().unwrap();
    let target = project(
        dir.path(),
        r#"
[library]
sources = "sources"

[build]
library_heap_kb = 65536
runtime_memory_mb = 64
"#,
    );
    let srcs = LocalSources::new(dir.path().join("sources"));
    let emcc = RecordingEmcc::default();

    let result = session(dir.path(), &emcc, &srcs).build_project(&target);
    assert!(!result.success);
    assert!(emcc.calls().is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("72 MB total"));
}

#[test]
fn missing_library_sources_fail_as_data() {
    let dir = TempDir::new().unwrap();
    let target = project(dir.path(), V9);
    let srcs = LocalSources::new(dir.path().join("elsewhere"));
    let emcc = RecordingEmcc::default();

    let result = session(dir.path(), &emcc, &srcs).build_project(&target);
    assert!(!result.success);
    assert!(result.errors[0].message.contains("lvgl-9.2.0"));
    assert!(emcc.calls().is_empty());
}
