//! Settings file loading and validation.

use crate::error::ConfigError;
use crate::types::BuildSettings;
use std::path::Path;

/// Name of the settings file within a project directory.
pub const SETTINGS_FILE: &str = "glint.toml";

/// Loads and validates `glint.toml` from a project directory.
///
/// A missing file yields the default settings; a present but invalid file is an error.
pub fn load_settings(project_dir: &Path) -> Result<BuildSettings, ConfigError> {
    let path = project_dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(BuildSettings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    load_settings_from_str(&content)
}

/// Parses and validates settings from a TOML string.
pub fn load_settings_from_str(content: &str) -> Result<BuildSettings, ConfigError> {
    let settings: BuildSettings =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Validates values that no build could succeed with.
///
/// The memory budget is checked per build by the orchestrator so that the
/// failure surfaces as a build diagnostic.
fn validate_settings(settings: &BuildSettings) -> Result<(), ConfigError> {
    settings.library_major()?;
    if settings.display.width == 0 || settings.display.height == 0 {
        return Err(ConfigError::ValidationError(
            "display width and height must be non-zero".to_string(),
        ));
    }
    if settings.build.library_heap_kb == 0 {
        return Err(ConfigError::ValidationError(
            "build.library_heap_kb must be non-zero".to_string(),
        ));
    }
    if settings.build.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "build.batch_size must be at least 1".to_string(),
        ));
    }
    if let Some(bad) = settings.build.defines.iter().find(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError(format!(
            "empty preprocessor define '{bad}'"
        )));
    }
    Ok(())
}
