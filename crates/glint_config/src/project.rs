//! Multi-file project description (`glint.json`).
//!
//! The file is parsed into a strongly-typed [`ProjectFile`] that rejects
//! unknown fields, then resolved once into an immutable
//! [`ResolvedProjectConfig`] whose paths are absolute and known to exist.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the project description file.
pub const PROJECT_FILE: &str = "glint.json";

/// The raw project description as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectFile {
    /// The user's main UI source file.
    pub main: String,
    /// Auxiliary sources compiled and cached individually.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Include directories for project sources.
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Preprocessor defines for project sources.
    #[serde(default)]
    pub defines: Vec<String>,
}

/// A project description with every path resolved and verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProjectConfig {
    /// Absolute path of the main source file.
    pub main_source: PathBuf,
    /// Absolute paths of dependency sources, in file order.
    pub dependency_sources: Vec<PathBuf>,
    /// Absolute include directories, in file order.
    pub include_paths: Vec<PathBuf>,
    /// Preprocessor defines, in file order.
    pub defines: Vec<String>,
    /// Directory containing the project file.
    pub config_dir: PathBuf,
}

impl ResolvedProjectConfig {
    /// Include paths as strings, for fingerprints and command lines.
    pub fn include_path_strings(&self) -> Vec<String> {
        self.include_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect()
    }
}

/// Walks up from `start` looking for the nearest `glint.json`.
pub fn find_project_file(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };
    loop {
        let candidate = current.join(PROJECT_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Parses a project description from a JSON string.
pub fn parse_project_file(content: &str) -> Result<ProjectFile, ConfigError> {
    let project: ProjectFile =
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    if project.main.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "\"main\" must name a source file".to_string(),
        ));
    }
    if let Some(bad) = project.defines.iter().find(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError(format!(
            "empty preprocessor define '{bad}'"
        )));
    }
    Ok(project)
}

/// Reads, validates, and resolves the project file at `path`.
///
/// Relative paths are resolved against the file's directory. Fails on the
/// first path that does not exist, and on dependency sources that share a
/// file stem (their objects would collide in the cache directory).
pub fn resolve_project(path: &Path) -> Result<ResolvedProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let project = parse_project_file(&content)?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let config_dir = std::fs::canonicalize(parent)?;

    let main_source = existing_file(&config_dir, &project.main, "main source")?;

    let mut dependency_sources = Vec::with_capacity(project.dependencies.len());
    let mut stems: HashMap<String, PathBuf> = HashMap::new();
    for dep in &project.dependencies {
        let resolved = existing_file(&config_dir, dep, "dependency source")?;
        let stem = resolved
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(previous) = stems.insert(stem.clone(), resolved.clone()) {
            return Err(ConfigError::ValidationError(format!(
                "dependencies {} and {} share the name '{stem}'",
                previous.display(),
                resolved.display()
            )));
        }
        dependency_sources.push(resolved);
    }

    let mut include_paths = Vec::with_capacity(project.include_paths.len());
    for inc in &project.include_paths {
        let resolved = absolutize(&config_dir, inc);
        if !resolved.is_dir() {
            return Err(ConfigError::MissingPath {
                what: "include directory",
                path: resolved,
            });
        }
        include_paths.push(resolved);
    }

    Ok(ResolvedProjectConfig {
        main_source,
        dependency_sources,
        include_paths,
        defines: project.defines,
        config_dir,
    })
}

fn absolutize(base: &Path, raw: &str) -> PathBuf {
    let p = Path::new(raw);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn existing_file(base: &Path, raw: &str, what: &'static str) -> Result<PathBuf, ConfigError> {
    let resolved = absolutize(base, raw);
    if resolved.is_file() {
        Ok(resolved)
    } else {
        Err(ConfigError::MissingPath {
            what,
            path: resolved,
        })
    }
}
