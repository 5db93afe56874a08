//! Whole-library compilation, cached per build key.
//!
//! Every distinct combination of library version, optimization, display
//! geometry, memory sizes and driver profile gets its own directory under the
//! library cache root. A directory containing the completion marker is
//! trusted as is: its objects are returned without recompiling or checking
//! them. The marker is written last, only after every source compiled.

use std::path::{Path, PathBuf};

use glint_config::BuildSettings;
use glint_toolchain::{InvokeOptions, Toolchain};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{BuildError, Stage};
use crate::profile::{c_sources, DriverProfile, LV_CONF_HEADER, LV_DRV_CONF_HEADER};
use crate::sources::{ensure_cross_include, SourceProvider};

/// Bumped whenever the compile procedure itself changes incompatibly, such
/// as which files are precompiled versus compiled at link time.
pub const BUILD_STRATEGY_VERSION: &str = "s2";

/// Marker file whose presence asserts a key directory is complete.
pub const COMPLETE_MARKER: &str = ".complete";

/// The library objects for one key, plus what the later stages need to
/// compile against them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryBuild {
    /// The build key.
    pub key: String,
    /// Directory holding the objects and generated headers.
    pub dir: PathBuf,
    /// Object files, in path order.
    pub objects: Vec<PathBuf>,
    /// Include directories for sources that use the library.
    pub include_paths: Vec<PathBuf>,
    /// Driver sources left for the link step.
    pub driver_sources: Vec<PathBuf>,
    /// `true` if a completed build was reused.
    pub reused: bool,
}

#[derive(Serialize)]
struct Marker<'a> {
    key: &'a str,
    objects: &'a [PathBuf],
}

/// Builds or reuses the graphics library.
pub struct LibraryBuilder<'a> {
    settings: &'a BuildSettings,
    profile: DriverProfile,
    sources: &'a dyn SourceProvider,
    toolchain: &'a dyn Toolchain,
    root: PathBuf,
}

impl<'a> LibraryBuilder<'a> {
    /// Creates a builder whose key directories live under `root`.
    pub fn new(
        settings: &'a BuildSettings,
        profile: DriverProfile,
        sources: &'a dyn SourceProvider,
        toolchain: &'a dyn Toolchain,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            profile,
            sources,
            toolchain,
            root: root.into(),
        }
    }

    /// The key for the current settings:
    /// `{version}_{opt}_{w}x{h}_mem{heap}k{runtime}m{driver}_{strategy}`.
    pub fn cache_key(&self) -> String {
        let s = self.settings;
        format!(
            "{}_{}_{}x{}_mem{}k{}m{}_{}",
            s.library.version.trim().trim_start_matches('v'),
            s.build.optimization.as_flag().trim_start_matches('-'),
            s.display.width,
            s.display.height,
            s.build.library_heap_kb,
            s.build.runtime_memory_mb,
            self.profile.key_suffix(),
            BUILD_STRATEGY_VERSION,
        )
    }

    /// The directory for the current key.
    pub fn key_dir(&self) -> PathBuf {
        self.root.join(self.cache_key())
    }

    /// Returns the library objects, compiling them if no completed build exists.
    ///
    /// Any failure aborts the build without writing the marker.
    pub fn build(&self) -> Result<LibraryBuild, BuildError> {
        let key = self.cache_key();
        let dir = self.root.join(&key);

        // Resolved before the marker check: a reused build still hands out
        // include paths and driver sources that live in the source trees.
        let library_dir = self.sources.library_dir(&self.settings.library.version)?;
        let driver_dir = if self.profile.needs_driver_package() {
            Some(self.sources.driver_dir()?)
        } else {
            None
        };
        let include_paths =
            self.profile
                .include_paths(&dir, &library_dir, driver_dir.as_deref());
        let driver_sources = self
            .profile
            .driver_sources(&library_dir, driver_dir.as_deref())?;

        if dir.join(COMPLETE_MARKER).is_file() {
            let objects = list_objects(&dir)?;
            info!(key = %key, objects = objects.len(), "reusing library build");
            return Ok(LibraryBuild {
                key,
                dir,
                objects,
                include_paths,
                driver_sources,
                reused: true,
            });
        }

        info!(key = %key, library = %library_dir.display(), "building library");
        if dir.exists() {
            // Leftovers of an interrupted build must not leak into the object list.
            std::fs::remove_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;

        self.write_headers(&dir, &library_dir, driver_dir.as_deref())?;
        if let Some(driver) = &driver_dir {
            ensure_cross_include(&library_dir, driver)?;
        }

        let sources = self.library_sources(&library_dir)?;
        let mut objects = self.compile_all(&sources, &library_dir, &dir, &include_paths)?;
        if objects.is_empty() {
            return Err(BuildError::BuildFailure {
                stage: Stage::Library,
                message: format!(
                    "no objects were produced from {} sources in {}",
                    sources.len(),
                    library_dir.display()
                ),
            });
        }
        objects.sort();

        write_marker(&dir, &key, &objects)?;
        info!(key = %key, objects = objects.len(), "library build complete");
        Ok(LibraryBuild {
            key,
            dir,
            objects,
            include_paths,
            driver_sources,
            reused: false,
        })
    }

    /// Deletes every key directory under the library cache root.
    pub fn clear_cache(&self) {
        clear_library_cache(&self.root);
    }

    /// Writes the generated headers into the key directory and copies them
    /// into the source trees.
    fn write_headers(
        &self,
        dir: &Path,
        library_dir: &Path,
        driver_dir: Option<&Path>,
    ) -> Result<(), BuildError> {
        let conf = self.profile.render_lv_conf(self.settings);
        write_file(&dir.join(LV_CONF_HEADER), &conf)?;
        write_file(&library_dir.join(LV_CONF_HEADER), &conf)?;

        if let (Some(drv_conf), Some(driver)) = (self.profile.render_drv_conf(self.settings), driver_dir)
        {
            write_file(&dir.join(LV_DRV_CONF_HEADER), &drv_conf)?;
            write_file(&driver.join(LV_DRV_CONF_HEADER), &drv_conf)?;
        }
        Ok(())
    }

    /// All `.c` files under the library's `src/`, minus the profile's exclusions.
    fn library_sources(&self, library_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
        let excluded: Vec<PathBuf> = self
            .profile
            .excluded_library_dirs()
            .iter()
            .map(|rel| library_dir.join(rel))
            .collect();
        let sources: Vec<PathBuf> = c_sources(&library_dir.join("src"))?
            .into_iter()
            .filter(|src| !excluded.iter().any(|ex| src.starts_with(ex)))
            .collect();
        debug!(count = sources.len(), excluded = excluded.len(), "enumerated library sources");
        Ok(sources)
    }

    /// Compiles `sources` in batches of `batch_size`, each batch in parallel.
    ///
    /// A batch is fully finished before the next starts, which bounds the
    /// number of concurrent compiler processes.
    fn compile_all(
        &self,
        sources: &[PathBuf],
        library_dir: &Path,
        dir: &Path,
        include_paths: &[PathBuf],
    ) -> Result<Vec<PathBuf>, BuildError> {
        let batch_size = self.settings.build.batch_size.max(1);
        let batches = sources.len().div_ceil(batch_size);
        let mut objects = Vec::with_capacity(sources.len());

        for (i, batch) in sources.chunks(batch_size).enumerate() {
            let compiled = batch
                .par_iter()
                .map(|src| self.compile_one(src, library_dir, dir, include_paths))
                .collect::<Result<Vec<_>, _>>()?;
            objects.extend(compiled.into_iter().flatten());
            debug!(batch = i + 1, batches, "library batch compiled");
        }
        Ok(objects)
    }

    fn compile_one(
        &self,
        src: &Path,
        library_dir: &Path,
        dir: &Path,
        include_paths: &[PathBuf],
    ) -> Result<Option<PathBuf>, BuildError> {
        let out = dir.join(object_name(src, library_dir));
        let mut args = vec![
            self.settings.build.optimization.as_flag().to_string(),
            "-c".to_string(),
            src.display().to_string(),
            "-o".to_string(),
            out.display().to_string(),
        ];
        args.extend(include_paths.iter().map(|p| format!("-I{}", p.display())));
        args.extend(self.profile.defines().iter().map(|d| format!("-D{d}")));

        let options =
            InvokeOptions::default().with_max_output_bytes(self.settings.build.max_output_bytes);
        self.toolchain
            .invoke(&self.settings.toolchain.emcc, &args, &options)
            .map_err(|source| BuildError::Toolchain {
                stage: Stage::Library,
                source,
            })?;

        Ok(out.is_file().then_some(out))
    }
}

/// Deletes everything under a library cache root.
///
/// Best-effort: failures are logged and skipped.
pub fn clear_library_cache(root: &Path) {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(dir = %root.display(), error = %e, "could not list library cache");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "could not delete library cache entry");
        }
    }
}

/// Flattens a library-relative source path into a unique object file name:
/// `src/core/lv_obj.c` becomes `src_core_lv_obj.o`.
fn object_name(src: &Path, library_dir: &Path) -> String {
    let rel = src.strip_prefix(library_dir).unwrap_or(src);
    let flat: Vec<String> = rel
        .with_extension("o")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    flat.join("_")
}

fn list_objects(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let entries = std::fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))?;
    let mut objects: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "o"))
        .collect();
    objects.sort();
    Ok(objects)
}

fn write_marker(dir: &Path, key: &str, objects: &[PathBuf]) -> Result<(), BuildError> {
    let json = serde_json::to_string_pretty(&Marker { key, objects }).map_err(|e| {
        BuildError::BuildFailure {
            stage: Stage::Library,
            message: format!("could not serialize completion marker: {e}"),
        }
    })?;
    write_file(&dir.join(COMPLETE_MARKER), &json)
}

fn write_file(path: &Path, content: &str) -> Result<(), BuildError> {
    std::fs::write(path, content).map_err(|e| BuildError::io(path, e))
}
