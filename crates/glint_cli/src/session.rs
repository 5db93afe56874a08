//! Settings and collaborators shared by every command.

use std::path::{Path, PathBuf};

use glint_build::{BuildError, LocalSources, Orchestrator};
use glint_config::{load_settings, load_settings_from_str, BuildSettings, ConfigError};
use glint_toolchain::ProcessToolchain;
use tracing::debug;

use crate::GlobalArgs;

/// Everything needed to open an [`Orchestrator`] for one project directory.
pub struct Session {
    /// Loaded settings, with cache and source paths made absolute.
    pub settings: BuildSettings,
    /// Directory relative settings paths were resolved against.
    pub project_dir: PathBuf,
    sources: LocalSources,
    toolchain: ProcessToolchain,
}

impl Session {
    /// Loads settings for `project_dir`, or from `--config` when given.
    pub fn open(project_dir: &Path, global: &GlobalArgs) -> Result<Self, ConfigError> {
        let project_dir = std::path::absolute(project_dir)?;
        let mut settings = match &global.config {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                load_settings_from_str(&content)?
            }
            None => load_settings(&project_dir)?,
        };
        settings.cache.dir = resolve(&project_dir, &settings.cache.dir);
        settings.library.sources = resolve(&project_dir, &settings.library.sources);
        debug!(
            project = %project_dir.display(),
            cache = %settings.cache.dir.display(),
            sources = %settings.library.sources.display(),
            "loaded settings"
        );

        Ok(Self {
            sources: LocalSources::new(settings.library.sources.clone()),
            toolchain: ProcessToolchain::new(),
            settings,
            project_dir,
        })
    }

    /// Opens a build session over the project's caches.
    pub fn orchestrator(&self) -> Result<Orchestrator<'_>, BuildError> {
        Orchestrator::new(
            self.settings.clone(),
            &self.toolchain,
            &self.sources,
            self.settings.cache.dir.clone(),
        )
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
