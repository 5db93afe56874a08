//! Incremental compilation of project dependency sources.

use std::path::{Path, PathBuf};

use glint_cache::ObjectCache;
use glint_config::OptLevel;
use glint_diagnostics::{parse_toolchain_output, Diagnostic};
use glint_toolchain::{InvokeError, InvokeOptions, Toolchain};
use tracing::{debug, info, warn};

use crate::error::{BuildError, Stage};

/// Objects for a dependency compile, plus what the compiler reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyOutput {
    /// One object per successfully compiled or reused source. Not in input order.
    pub objects: Vec<PathBuf>,
    /// Sources that produced no object.
    pub missing: Vec<PathBuf>,
    /// Diagnostics parsed from the compiler output.
    pub diagnostics: Vec<Diagnostic>,
    /// How many sources were served from the cache.
    pub reused: usize,
}

/// Compiles dependency sources into the object cache's directory.
pub struct DependencyBuilder<'a> {
    cache: &'a mut ObjectCache,
    toolchain: &'a dyn Toolchain,
    emcc: &'a Path,
    max_output_bytes: usize,
}

impl<'a> DependencyBuilder<'a> {
    /// Creates a builder writing objects into `cache.dir()`.
    pub fn new(
        cache: &'a mut ObjectCache,
        toolchain: &'a dyn Toolchain,
        emcc: &'a Path,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            cache,
            toolchain,
            emcc,
            max_output_bytes,
        }
    }

    /// Reuses every cache-valid source and compiles the rest in one invocation.
    ///
    /// A source whose object does not appear after compiling is reported in
    /// [`DependencyOutput::missing`] rather than failing the call. Compiler
    /// errors are returned as diagnostics; only a compiler that cannot be run
    /// at all, or a cache that cannot be written, is an `Err`.
    pub fn compile(
        &mut self,
        files: &[PathBuf],
        include_paths: &[PathBuf],
        optimization: OptLevel,
        defines: &[String],
    ) -> Result<DependencyOutput, BuildError> {
        let valid = self.cache.get_valid_entries(files);
        let stale: Vec<&PathBuf> = files.iter().filter(|f| !valid.contains_key(*f)).collect();

        let mut output = DependencyOutput {
            reused: valid.len(),
            ..DependencyOutput::default()
        };
        output.objects.extend(
            files
                .iter()
                .filter_map(|f| valid.get(f).cloned()),
        );
        info!(
            total = files.len(),
            reused = valid.len(),
            stale = stale.len(),
            "compiling dependencies"
        );
        if stale.is_empty() {
            return Ok(output);
        }

        let dir = self.cache.dir().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;

        // Remove old objects first so a failed compile can't look like a fresh one.
        let expected: Vec<(&PathBuf, PathBuf)> = stale
            .iter()
            .map(|src| (*src, object_path(&dir, src)))
            .collect();
        for (_, obj) in &expected {
            match std::fs::remove_file(obj) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(BuildError::io(obj, e)),
            }
        }

        let mut args = vec![optimization.as_flag().to_string(), "-c".to_string()];
        args.extend(stale.iter().map(|src| src.display().to_string()));
        args.extend(include_paths.iter().map(|p| format!("-I{}", p.display())));
        args.extend(defines.iter().map(|d| format!("-D{d}")));

        let options = InvokeOptions::default()
            .with_cwd(&dir)
            .with_max_output_bytes(self.max_output_bytes);
        let text = match self.toolchain.invoke(self.emcc, &args, &options) {
            Ok(out) => out.combined(),
            Err(InvokeError::Exit { output, code, .. }) => {
                warn!(?code, "dependency compile reported errors");
                output.combined()
            }
            Err(source) => {
                return Err(BuildError::Toolchain {
                    stage: Stage::Dependencies,
                    source,
                })
            }
        };
        output.diagnostics = parse_toolchain_output(&text);

        for (src, obj) in expected {
            if obj.is_file() {
                self.cache.record_build(src, &obj)?;
                debug!(source = %src.display(), "recorded dependency object");
                output.objects.push(obj);
            } else {
                output.missing.push(src.clone());
            }
        }
        Ok(output)
    }
}

/// The toolchain names each object after its source's stem in the working directory.
fn object_path(dir: &Path, source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or(source.as_os_str());
    let mut obj = dir.join(stem);
    obj.as_mut_os_string().push(".o");
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolchain;
    use glint_common::SettingsFingerprint;

    struct Fixture {
        _dir: tempfile::TempDir,
        src: PathBuf,
        objects: PathBuf,
    }

    fn fixture(names: &[&str]) -> (Fixture, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let files = names
            .iter()
            .map(|n| {
                let p = src.join(n);
                std::fs::write(&p, format!("/* {n} */")).unwrap();
                p
            })
            .collect();
        let objects = dir.path().join("cache/objects");
        (
            Fixture {
                _dir: dir,
                src,
                objects,
            },
            files,
        )
    }

    fn compile(
        cache: &mut ObjectCache,
        tc: &FakeToolchain,
        files: &[PathBuf],
    ) -> DependencyOutput {
        DependencyBuilder::new(cache, tc, Path::new("emcc"), 1024)
            .compile(files, &[], OptLevel::O2, &[])
            .unwrap()
    }

    #[test]
    fn cold_cache_compiles_once_and_records() {
        let (fx, files) = fixture(&["a.c"]);
        let mut cache = ObjectCache::open(&fx.objects, SettingsFingerprint::from("f1"));
        let tc = FakeToolchain::new();

        let out = compile(&mut cache, &tc, &files);
        assert_eq!(tc.call_count(), 1);
        assert_eq!(out.objects, vec![fx.objects.join("a.o")]);
        assert!(cache.is_valid(&files[0]));
        assert_eq!(tc.calls()[0].cwd.as_deref(), Some(fx.objects.as_path()));
    }

    #[test]
    fn partial_reuse_compiles_only_stale_file() {
        let (fx, files) = fixture(&["a.c", "b.c", "c.c"]);
        let mut cache = ObjectCache::open(&fx.objects, SettingsFingerprint::from("f1"));
        let tc = FakeToolchain::new();
        compile(&mut cache, &tc, &files);

        std::fs::write(&files[1], "/* b changed */").unwrap();
        let tc = FakeToolchain::new();
        let out = compile(&mut cache, &tc, &files);

        assert_eq!(tc.call_count(), 1);
        assert_eq!(tc.calls()[0].sources(), vec![files[1].display().to_string()]);
        assert_eq!(out.reused, 2);
        let mut objects = out.objects.clone();
        objects.sort();
        assert_eq!(
            objects,
            vec![
                fx.objects.join("a.o"),
                fx.objects.join("b.o"),
                fx.objects.join("c.o")
            ]
        );
    }

    #[test]
    fn all_valid_skips_toolchain() {
        let (fx, files) = fixture(&["a.c", "b.c"]);
        let mut cache = ObjectCache::open(&fx.objects, SettingsFingerprint::from("f1"));
        compile(&mut cache, &FakeToolchain::new(), &files);

        let tc = FakeToolchain::new();
        let out = compile(&mut cache, &tc, &files);
        assert_eq!(tc.call_count(), 0);
        assert_eq!(out.objects.len(), 2);
        assert_eq!(out.reused, 2);
    }

    #[test]
    fn settings_change_recompiles_everything() {
        let (fx, files) = fixture(&["a.c", "b.c"]);
        let mut cache = ObjectCache::open(&fx.objects, SettingsFingerprint::from("f1"));
        compile(&mut cache, &FakeToolchain::new(), &files);

        cache.set_fingerprint(SettingsFingerprint::from("f2"));
        assert!(files.iter().all(|f| !cache.is_valid(f)));
        let tc = FakeToolchain::new();
        let out = compile(&mut cache, &tc, &files);
        assert_eq!(tc.calls()[0].sources().len(), 2);
        assert_eq!(out.reused, 0);
        assert!(files.iter().all(|f| cache.is_valid(f)));
    }

    #[test]
    fn failed_source_is_dropped_not_fatal() {
        let (fx, files) = fixture(&["good.c", "bad.c"]);
        let mut cache = ObjectCache::open(&fx.objects, SettingsFingerprint::from("f1"));
        let tc = FakeToolchain::new().failing_on("bad.c");

        let out = compile(&mut cache, &tc, &files);
        assert_eq!(out.objects, vec![fx.objects.join("good.o")]);
        assert_eq!(out.missing, vec![fx.src.join("bad.c")]);
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.diagnostics[0].is_error());
        assert!(!cache.is_valid(&files[1]));
    }

    #[test]
    fn stale_object_is_not_mistaken_for_output() {
        let (fx, files) = fixture(&["a.c"]);
        let mut cache = ObjectCache::open(&fx.objects, SettingsFingerprint::from("f1"));
        compile(&mut cache, &FakeToolchain::new(), &files);

        std::fs::write(&files[0], "/* now broken */").unwrap();
        let tc = FakeToolchain::new().failing_on("a.c");
        let out = compile(&mut cache, &tc, &files);
        assert!(out.objects.is_empty());
        assert_eq!(out.missing, files);
        assert!(!fx.objects.join("a.o").exists());
    }

    #[test]
    fn flags_reach_the_compiler() {
        let (fx, files) = fixture(&["a.c"]);
        let mut cache = ObjectCache::open(&fx.objects, SettingsFingerprint::from("f1"));
        let tc = FakeToolchain::new();
        DependencyBuilder::new(&mut cache, &tc, Path::new("emcc"), 1024)
            .compile(
                &files,
                &[PathBuf::from("/inc")],
                OptLevel::Os,
                &["FOO=1".to_string()],
            )
            .unwrap();
        let args = &tc.calls()[0].args;
        assert_eq!(args[0], "-Os");
        assert!(args.contains(&"-c".to_string()));
        assert!(args.contains(&"-I/inc".to_string()));
        assert!(args.contains(&"-DFOO=1".to_string()));
    }

    #[test]
    fn object_path_uses_stem() {
        assert_eq!(
            object_path(Path::new("/c"), Path::new("/p/widgets.c")),
            PathBuf::from("/c/widgets.o")
        );
    }
}
