//! Sequencing the stages for one build request.
//!
//! The [`Orchestrator`] is the error boundary of the pipeline: whatever goes
//! wrong below it, [`Orchestrator::build_project`] returns a
//! [`CompilationResult`], with at least one diagnostic when it failed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glint_cache::ObjectCache;
use glint_common::hash_settings;
use glint_config::{BuildSettings, ResolvedProjectConfig};
use glint_diagnostics::{parse_toolchain_output, Diagnostic};
use glint_toolchain::Toolchain;
use tracing::{info, warn};

use crate::dependency::DependencyBuilder;
use crate::error::BuildError;
use crate::library::{clear_library_cache, LibraryBuilder};
use crate::link::{LinkRequest, Linker};
use crate::profile::{DriverProfile, HARNESS_SOURCE};
use crate::result::CompilationResult;
use crate::sources::SourceProvider;

/// Object cache directory under the cache root.
pub const OBJECTS_DIR: &str = "objects";

/// Library cache directory under the cache root.
pub const LIBRARY_DIR: &str = "lib";

/// Build output directory under the cache root.
pub const BUILD_DIR: &str = "build";

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    /// One UI source with no dependencies.
    SingleFile(PathBuf),
    /// A resolved multi-file project.
    Project(ResolvedProjectConfig),
}

impl BuildTarget {
    /// The user's main UI source.
    pub fn main_source(&self) -> &Path {
        match self {
            BuildTarget::SingleFile(path) => path,
            BuildTarget::Project(cfg) => &cfg.main_source,
        }
    }

    /// Directory that relative settings paths are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        match self {
            BuildTarget::SingleFile(path) => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            BuildTarget::Project(cfg) => cfg.config_dir.clone(),
        }
    }

    fn dependencies(&self) -> &[PathBuf] {
        match self {
            BuildTarget::SingleFile(_) => &[],
            BuildTarget::Project(cfg) => &cfg.dependency_sources,
        }
    }
}

/// One build session: settings, collaborators, and the caches they share.
///
/// The object cache is opened once here and reused by every build of the
/// session; nothing is looked up globally.
pub struct Orchestrator<'a> {
    settings: BuildSettings,
    toolchain: &'a dyn Toolchain,
    sources: &'a dyn SourceProvider,
    cache_root: PathBuf,
    objects: ObjectCache,
}

impl<'a> Orchestrator<'a> {
    /// Opens a session whose caches and outputs live under `cache_root`.
    pub fn new(
        settings: BuildSettings,
        toolchain: &'a dyn Toolchain,
        sources: &'a dyn SourceProvider,
        cache_root: impl Into<PathBuf>,
    ) -> Result<Self, BuildError> {
        let cache_root = cache_root.into();
        let fingerprint = hash_settings(&settings.settings_bundle(&[], &[]))?;
        let objects = ObjectCache::open(&cache_root.join(OBJECTS_DIR), fingerprint);
        Ok(Self {
            settings,
            toolchain,
            sources,
            cache_root,
            objects,
        })
    }

    /// The session's settings.
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// The session's object cache.
    pub fn object_cache(&self) -> &ObjectCache {
        &self.objects
    }

    /// Root of all caches and outputs.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// The library build key the current settings map to.
    pub fn library_key(&self) -> Result<String, BuildError> {
        let profile = DriverProfile::for_version(&self.settings.library.version)?;
        Ok(self.library_builder(profile).cache_key())
    }

    /// Empties the object cache and deletes every library build.
    pub fn clear_caches(&mut self) {
        info!(root = %self.cache_root.display(), "clearing caches");
        self.objects.clear();
        clear_library_cache(&self.cache_root.join(LIBRARY_DIR));
    }

    /// Builds `target` and reports the outcome as data.
    ///
    /// Diagnostics appear in encounter order: dependency compilation first,
    /// then the link. A failure that has no compiler location is reported
    /// at line 1, column 1 of the main source.
    pub fn build_project(&mut self, target: &BuildTarget) -> CompilationResult {
        let mut diagnostics = Vec::new();
        match self.run(target, &mut diagnostics) {
            Ok(linked) => {
                diagnostics.extend(linked.errors);
                diagnostics.extend(linked.warnings);
                let result = CompilationResult::from_diagnostics(
                    diagnostics,
                    linked.primary_artifact,
                    linked.glue_artifact,
                );
                info!(
                    success = result.success,
                    errors = result.errors.len(),
                    warnings = result.warnings.len(),
                    "build finished"
                );
                result
            }
            Err(err) => {
                warn!(error = %err, "build aborted");
                diagnostics.extend(failure_diagnostics(target.main_source(), &err));
                CompilationResult::from_diagnostics(diagnostics, None, None)
            }
        }
    }

    fn run(
        &mut self,
        target: &BuildTarget,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<CompilationResult, BuildError> {
        self.settings.validate_memory_budget()?;
        let profile = DriverProfile::for_version(&self.settings.library.version)?;

        let main_source = target.main_source();
        if !main_source.is_file() {
            return Err(BuildError::io(
                main_source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "main source not found"),
            ));
        }
        info!(main = %main_source.display(), ?profile, "starting build");

        let library = self.library_builder(profile).build()?;

        let base = target.base_dir();
        let (project_includes, project_defines, extra_includes) = match target {
            BuildTarget::SingleFile(_) => (Vec::new(), Vec::new(), Vec::new()),
            BuildTarget::Project(cfg) => (
                cfg.include_paths.clone(),
                cfg.defines.clone(),
                cfg.include_path_strings(),
            ),
        };

        let mut include_paths = library.include_paths.clone();
        include_paths.extend(
            self.settings
                .build
                .include_paths
                .iter()
                .map(|p| absolutize(&base, p)),
        );
        include_paths.extend(project_includes);

        let profile_defines: Vec<String> = profile.defines().iter().map(|d| d.to_string()).collect();
        let mut defines = profile_defines.clone();
        defines.extend(self.settings.build.defines.iter().cloned());
        defines.extend(project_defines.iter().cloned());

        let mut extra_defines = profile_defines;
        extra_defines.extend(project_defines);
        let mut bundle = self.settings.settings_bundle(&extra_includes, &extra_defines);
        if profile.geometry_in_headers() {
            bundle.display = Some([self.settings.display.width, self.settings.display.height]);
        }
        self.objects.set_fingerprint(hash_settings(&bundle)?);

        let mut dependency_objects = Vec::new();
        let dependencies = target.dependencies();
        if !dependencies.is_empty() {
            let out = DependencyBuilder::new(
                &mut self.objects,
                self.toolchain,
                &self.settings.toolchain.emcc,
                self.settings.build.max_output_bytes,
            )
            .compile(
                dependencies,
                &include_paths,
                self.settings.build.optimization,
                &defines,
            )?;
            diagnostics.extend(out.diagnostics);
            for missing in &out.missing {
                diagnostics.push(Diagnostic::warning(
                    missing.display().to_string(),
                    1,
                    1,
                    "dependency produced no object and was left out of the link",
                ));
            }
            dependency_objects = out.objects;
        }

        let build_dir = self.cache_root.join(BUILD_DIR);
        std::fs::create_dir_all(&build_dir).map_err(|e| BuildError::io(&build_dir, e))?;
        let harness = build_dir.join(HARNESS_SOURCE);
        std::fs::write(&harness, profile.render_harness(&self.settings))
            .map_err(|e| BuildError::io(&harness, e))?;

        let user_sources = vec![main_source.to_path_buf()];
        let linker = Linker::new(
            self.toolchain,
            &self.settings.toolchain.emcc,
            Duration::from_secs(self.settings.build.link_timeout_secs),
            self.settings.build.max_output_bytes,
        );
        linker.link(&LinkRequest {
            main_source: &harness,
            user_sources: &user_sources,
            library_objects: &library.objects,
            dependency_objects: &dependency_objects,
            include_paths: &include_paths,
            defines: &defines,
            driver_sources: &library.driver_sources,
            optimization: self.settings.build.optimization,
            memory_budget_mb: self.settings.build.runtime_memory_mb,
            output_dir: &build_dir,
        })
    }

    fn library_builder(&self, profile: DriverProfile) -> LibraryBuilder<'_> {
        LibraryBuilder::new(
            &self.settings,
            profile,
            self.sources,
            self.toolchain,
            self.cache_root.join(LIBRARY_DIR),
        )
    }
}

/// Diagnostics describing an aborted build.
///
/// Compiler output carried by the error is parsed first; if it holds no
/// error, a single synthetic one is made from the error message.
fn failure_diagnostics(main_source: &Path, err: &BuildError) -> Vec<Diagnostic> {
    if let BuildError::Toolchain { source, .. } = err {
        if let Some(output) = source.output() {
            let parsed = parse_toolchain_output(&output.combined());
            if parsed.iter().any(Diagnostic::is_error) {
                return parsed;
            }
        }
    }
    vec![Diagnostic::synthetic(main_source, err.to_string())]
}

fn absolutize(base: &Path, raw: &str) -> PathBuf {
    let p = Path::new(raw);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
