//! Build settings and project configuration.
//!
//! [`BuildSettings`] is the configuration surface the build core consumes,
//! read from `glint.toml`. Multi-file projects are described by a `glint.json`
//! file that is parsed, validated, and resolved into a
//! [`ResolvedProjectConfig`] with absolute, existence-checked paths.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod project;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_settings, load_settings_from_str, SETTINGS_FILE};
pub use project::{
    find_project_file, parse_project_file, resolve_project, ProjectFile, ResolvedProjectConfig,
    PROJECT_FILE,
};
pub use types::*;
