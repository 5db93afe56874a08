//! Locating the graphics library and driver package on disk.
//!
//! Fetching sources is out of scope; a [`SourceProvider`] only answers where
//! an already-present tree lives and fails when it is absent.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::BuildError;

/// Name of the library tree nested inside the legacy driver package.
pub const CROSS_INCLUDE_DIR: &str = "lvgl";

/// Where library and driver sources are found.
pub trait SourceProvider: Send + Sync {
    /// Root of the library tree for `version` (the directory holding `lvgl.h`).
    fn library_dir(&self, version: &str) -> Result<PathBuf, BuildError>;

    /// Root of the legacy driver package.
    fn driver_dir(&self) -> Result<PathBuf, BuildError>;
}

/// Sources unpacked under one root: `<root>/lvgl-<version>` and `<root>/lv_drivers`.
#[derive(Debug, Clone)]
pub struct LocalSources {
    root: PathBuf,
}

impl LocalSources {
    /// Creates a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceProvider for LocalSources {
    fn library_dir(&self, version: &str) -> Result<PathBuf, BuildError> {
        let version = version.trim().trim_start_matches('v');
        existing_dir(self.root.join(format!("lvgl-{version}")), "graphics library")
    }

    fn driver_dir(&self) -> Result<PathBuf, BuildError> {
        existing_dir(self.root.join("lv_drivers"), "driver package")
    }
}

fn existing_dir(path: PathBuf, what: &str) -> Result<PathBuf, BuildError> {
    if path.is_dir() {
        Ok(path)
    } else {
        let source = std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{what} sources not found"),
        );
        Err(BuildError::io(path, source))
    }
}

/// Makes the library visible at `<driver_dir>/lvgl`, as the legacy driver
/// package's own includes expect.
///
/// Runs once per driver package: an existing `lvgl` directory is left as is.
/// The tree is copied into a private temporary directory and renamed into
/// place, so an interrupted copy never leaves a half-populated `lvgl`.
pub fn ensure_cross_include(library_dir: &Path, driver_dir: &Path) -> Result<PathBuf, BuildError> {
    let target = driver_dir.join(CROSS_INCLUDE_DIR);
    if target.is_dir() {
        debug!(target = %target.display(), "cross-include already present");
        return Ok(target);
    }

    let staging = driver_dir.join(format!(".{CROSS_INCLUDE_DIR}.tmp-{}", std::process::id()));
    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(|e| BuildError::io(&staging, e))?;
    }

    info!(from = %library_dir.display(), to = %target.display(), "copying library into driver package");
    if let Err(e) = copy_tree(library_dir, &staging) {
        remove_staging(&staging);
        return Err(e);
    }

    match std::fs::rename(&staging, &target) {
        Ok(()) => Ok(target),
        // Lost a race with another copy; theirs is complete by construction.
        Err(_) if target.is_dir() => {
            remove_staging(&staging);
            Ok(target)
        }
        Err(e) => {
            remove_staging(&staging);
            Err(BuildError::io(&target, e))
        }
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), BuildError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            BuildError::io(path, std::io::Error::other(e))
        })?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| BuildError::io(entry.path(), std::io::Error::other(e)))?;
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| BuildError::io(&dest, e))?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &dest).map_err(|e| BuildError::io(&dest, e))?;
        }
    }
    Ok(())
}

fn remove_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        warn!(path = %staging.display(), error = %e, "could not remove staging directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(root: &Path) -> PathBuf {
        let lib = root.join("lvgl-8.3.11");
        std::fs::create_dir_all(lib.join("src/core")).unwrap();
        std::fs::write(lib.join("lvgl.h"), "#include \"src/lvgl.h\"").unwrap();
        std::fs::write(lib.join("src/core/lv_obj.h"), "// obj").unwrap();
        lib
    }

    #[test]
    fn local_sources_resolve_layout() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library(dir.path());
        std::fs::create_dir_all(dir.path().join("lv_drivers")).unwrap();

        let sources = LocalSources::new(dir.path());
        assert_eq!(sources.library_dir("v8.3.11").unwrap(), lib);
        assert_eq!(
            sources.driver_dir().unwrap(),
            dir.path().join("lv_drivers")
        );
    }

    #[test]
    fn missing_sources_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sources = LocalSources::new(dir.path());
        match sources.library_dir("9.2.0").unwrap_err() {
            BuildError::Io { path, source } => {
                assert!(path.ends_with("lvgl-9.2.0"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected Io, got {other:?}"),
        }
        assert!(sources.driver_dir().is_err());
    }

    #[test]
    fn cross_include_copies_tree_once() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library(dir.path());
        let drv = dir.path().join("lv_drivers");
        std::fs::create_dir_all(&drv).unwrap();

        let target = ensure_cross_include(&lib, &drv).unwrap();
        assert_eq!(target, drv.join("lvgl"));
        assert!(target.join("lvgl.h").is_file());
        assert!(target.join("src/core/lv_obj.h").is_file());

        // A second call must not recopy: changes to the library are not picked up.
        std::fs::write(lib.join("lvgl.h"), "changed").unwrap();
        ensure_cross_include(&lib, &drv).unwrap();
        assert_eq!(
            std::fs::read_to_string(target.join("lvgl.h")).unwrap(),
            "#include \"src/lvgl.h\""
        );
    }

    #[test]
    fn cross_include_leaves_no_staging_dir() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library(dir.path());
        let drv = dir.path().join("lv_drivers");
        std::fs::create_dir_all(&drv).unwrap();

        ensure_cross_include(&lib, &drv).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(&drv)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn cross_include_replaces_stale_staging() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library(dir.path());
        let drv = dir.path().join("lv_drivers");
        let stale = drv.join(format!(".lvgl.tmp-{}", std::process::id()));
        std::fs::create_dir_all(stale.join("junk")).unwrap();

        let target = ensure_cross_include(&lib, &drv).unwrap();
        assert!(!target.join("junk").exists());
        assert!(target.join("lvgl.h").is_file());
    }
}
