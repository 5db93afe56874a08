//! Settings types deserialized from `glint.toml`.

use std::fmt;
use std::path::PathBuf;

use glint_common::SettingsBundle;
use serde::Deserialize;

use crate::error::ConfigError;

/// Runtime memory reserved for stack, SDL buffers, and the C runtime, in MiB.
pub const FIXED_OVERHEAD_MB: u32 = 8;

/// The complete configuration surface consumed by the build core.
///
/// Every section is optional in the file; missing fields take the defaults
/// shown in `glint.toml` documentation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
    /// Which graphics library to build and where its sources live.
    #[serde(default)]
    pub library: LibrarySettings,
    /// Compiler flags and memory sizing.
    #[serde(default)]
    pub build: CompileSettings,
    /// Simulated display geometry.
    #[serde(default)]
    pub display: DisplaySettings,
    /// Location of the compiler driver.
    #[serde(default)]
    pub toolchain: ToolchainSettings,
    /// Location of the build caches.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Graphics library selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibrarySettings {
    /// Library version string (e.g. "9.2.0" or "8.3.11").
    #[serde(default = "default_version")]
    pub version: String,
    /// Root directory holding `lvgl-<version>/` and `lv_drivers/`.
    #[serde(default = "default_sources")]
    pub sources: PathBuf,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            sources: default_sources(),
        }
    }
}

fn default_version() -> String {
    "9.2.0".to_string()
}

fn default_sources() -> PathBuf {
    PathBuf::from(".glint/sources")
}

/// Compiler optimization level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum OptLevel {
    /// No optimization.
    #[serde(rename = "-O0")]
    O0,
    /// Basic optimization.
    #[serde(rename = "-O1")]
    O1,
    /// Standard optimization.
    #[default]
    #[serde(rename = "-O2")]
    O2,
    /// Aggressive optimization.
    #[serde(rename = "-O3")]
    O3,
    /// Optimize for size.
    #[serde(rename = "-Os")]
    Os,
    /// Optimize aggressively for size.
    #[serde(rename = "-Oz")]
    Oz,
}

impl OptLevel {
    /// Returns the compiler flag for this level.
    pub fn as_flag(self) -> &'static str {
        match self {
            OptLevel::O0 => "-O0",
            OptLevel::O1 => "-O1",
            OptLevel::O2 => "-O2",
            OptLevel::O3 => "-O3",
            OptLevel::Os => "-Os",
            OptLevel::Oz => "-Oz",
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Compiler flags, memory sizing, and process limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileSettings {
    /// Optimization level for every compile and link step.
    #[serde(default)]
    pub optimization: OptLevel,
    /// Library heap (`LV_MEM_SIZE`) in KiB.
    #[serde(default = "default_heap_kb")]
    pub library_heap_kb: u32,
    /// Total runtime memory (`INITIAL_MEMORY`) in MiB.
    #[serde(default = "default_runtime_mb")]
    pub runtime_memory_mb: u32,
    /// Extra include directories applied to user sources.
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Extra preprocessor defines applied to user sources.
    #[serde(default)]
    pub defines: Vec<String>,
    /// Number of library sources compiled concurrently.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Upper bound on the link step, in seconds.
    #[serde(default = "default_link_timeout")]
    pub link_timeout_secs: u64,
    /// Maximum captured bytes of each of stdout and stderr.
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            optimization: OptLevel::default(),
            library_heap_kb: default_heap_kb(),
            runtime_memory_mb: default_runtime_mb(),
            include_paths: Vec::new(),
            defines: Vec::new(),
            batch_size: default_batch_size(),
            link_timeout_secs: default_link_timeout(),
            max_output_bytes: default_max_output(),
        }
    }
}

fn default_heap_kb() -> u32 {
    256
}

fn default_runtime_mb() -> u32 {
    32
}

fn default_batch_size() -> usize {
    8
}

fn default_link_timeout() -> u64 {
    120
}

fn default_max_output() -> usize {
    10 * 1024 * 1024
}

/// Simulated display geometry in pixels.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplaySettings {
    /// Horizontal resolution.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Vertical resolution.
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_width() -> u32 {
    480
}

fn default_height() -> u32 {
    320
}

/// Compiler driver location.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainSettings {
    /// Path to (or name of) the `emcc` driver.
    #[serde(default = "default_emcc")]
    pub emcc: PathBuf,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            emcc: default_emcc(),
        }
    }
}

fn default_emcc() -> PathBuf {
    PathBuf::from("emcc")
}

/// Cache location.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Root directory of all glint caches and build outputs.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".glint-cache")
}

/// Parses the major component of a version string such as `"v8.3.11"`.
pub fn parse_major(version: &str) -> Result<u32, ConfigError> {
    let version = version.trim();
    version
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .ok_or_else(|| ConfigError::UnsupportedVersion(version.to_string()))
}

impl BuildSettings {
    /// Returns the major component of the library version.
    pub fn library_major(&self) -> Result<u32, ConfigError> {
        parse_major(&self.library.version)
    }

    /// Library heap rounded up to whole MiB.
    pub fn library_heap_mb(&self) -> u32 {
        self.build.library_heap_kb.div_ceil(1024)
    }

    /// Checks `runtime_memory_mb >= ceil(heap MiB) + FIXED_OVERHEAD_MB`.
    pub fn validate_memory_budget(&self) -> Result<(), ConfigError> {
        let heap_mb = self.library_heap_mb();
        let required_mb = heap_mb + FIXED_OVERHEAD_MB;
        if self.build.runtime_memory_mb < required_mb {
            return Err(ConfigError::MemoryBudget {
                runtime_mb: self.build.runtime_memory_mb,
                heap_mb,
                overhead_mb: FIXED_OVERHEAD_MB,
                required_mb,
            });
        }
        Ok(())
    }

    /// Builds the bundle whose fingerprint keys the object cache.
    ///
    /// `extra_include_paths` and `extra_defines` are the project- and
    /// profile-specific values that also reach the compiler command line.
    pub fn settings_bundle(
        &self,
        extra_include_paths: &[String],
        extra_defines: &[String],
    ) -> SettingsBundle {
        let mut include_paths = self.build.include_paths.clone();
        include_paths.extend_from_slice(extra_include_paths);
        let mut defines = self.build.defines.clone();
        defines.extend_from_slice(extra_defines);
        SettingsBundle {
            library_version: self.library.version.clone(),
            optimization: self.build.optimization.as_flag().to_string(),
            library_heap_kb: self.build.library_heap_kb,
            runtime_memory_mb: self.build.runtime_memory_mb,
            include_paths,
            defines,
            display: None,
        }
    }
}
