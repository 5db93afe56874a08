//! Per-major-version build behavior.
//!
//! LVGL 8 and LVGL 9 need different driver sources, defines, include paths
//! and generated headers. All of that is resolved once per build into a
//! [`DriverProfile`] and read from it as data; no stage branches on the
//! version number itself.

use std::path::{Path, PathBuf};

use glint_config::{parse_major, BuildSettings, ConfigError};
use walkdir::WalkDir;

use crate::error::BuildError;

/// Name of the generated library configuration header.
pub const LV_CONF_HEADER: &str = "lv_conf.h";

/// Name of the generated legacy driver configuration header.
pub const LV_DRV_CONF_HEADER: &str = "lv_drv_conf.h";

/// Name of the generated entry harness.
pub const HARNESS_SOURCE: &str = "main.c";

/// Driver layout for one major version of the graphics library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverProfile {
    /// LVGL 8: SDL support lives in the separate `lv_drivers` package.
    Legacy,
    /// LVGL 9: SDL support is built into the library under `src/drivers/sdl`.
    Builtin,
}

impl DriverProfile {
    /// Resolves the profile from a version string such as `"8.3.11"` or `"v9.2.0"`.
    pub fn for_version(version: &str) -> Result<Self, ConfigError> {
        match parse_major(version)? {
            8 => Ok(DriverProfile::Legacy),
            9 => Ok(DriverProfile::Builtin),
            _ => Err(ConfigError::UnsupportedVersion(version.trim().to_string())),
        }
    }

    /// Whether the external driver package must be present.
    pub fn needs_driver_package(self) -> bool {
        matches!(self, DriverProfile::Legacy)
    }

    /// Suffix appended to the library cache key.
    pub fn key_suffix(self) -> &'static str {
        match self {
            DriverProfile::Legacy => "_drv",
            DriverProfile::Builtin => "",
        }
    }

    /// Library-relative directories never precompiled by the library stage.
    ///
    /// These sources need SDL headers that only the toolchain's ports provide
    /// at link time.
    pub fn excluded_library_dirs(self) -> &'static [&'static str] {
        match self {
            DriverProfile::Legacy => &[],
            DriverProfile::Builtin => &["src/drivers/sdl"],
        }
    }

    /// Whether sources compiled against this profile see the display
    /// geometry through a generated header (`lv_drv_conf.h`).
    pub fn geometry_in_headers(self) -> bool {
        matches!(self, DriverProfile::Legacy)
    }

    /// Preprocessor defines applied to every compile and the link.
    pub fn defines(self) -> &'static [&'static str] {
        match self {
            DriverProfile::Legacy => &[
                "LV_CONF_INCLUDE_SIMPLE",
                "LV_LVGL_H_INCLUDE_SIMPLE",
                "USE_SDL",
            ],
            DriverProfile::Builtin => &["LV_CONF_INCLUDE_SIMPLE", "LV_USE_SDL=1"],
        }
    }

    /// Include directories, in search order.
    ///
    /// `config_dir` holds the generated headers and comes first so they win
    /// over any copy left in a shared source tree.
    pub fn include_paths(
        self,
        config_dir: &Path,
        library_dir: &Path,
        driver_dir: Option<&Path>,
    ) -> Vec<PathBuf> {
        let mut paths = vec![config_dir.to_path_buf(), library_dir.to_path_buf()];
        if let (DriverProfile::Legacy, Some(driver)) = (self, driver_dir) {
            paths.push(driver.to_path_buf());
        }
        paths
    }

    /// Driver sources compiled by the link step rather than the library stage.
    pub fn driver_sources(
        self,
        library_dir: &Path,
        driver_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>, BuildError> {
        match self {
            DriverProfile::Legacy => {
                let Some(driver) = driver_dir else {
                    return Ok(Vec::new());
                };
                Ok(["sdl/sdl.c", "sdl/sdl_common.c"]
                    .iter()
                    .map(|rel| driver.join(rel))
                    .filter(|p| p.is_file())
                    .collect())
            }
            DriverProfile::Builtin => {
                let mut sources = Vec::new();
                for dir in self.excluded_library_dirs() {
                    sources.extend(c_sources(&library_dir.join(dir))?);
                }
                Ok(sources)
            }
        }
    }

    /// Renders `lv_conf.h` for the configured heap size.
    pub fn render_lv_conf(self, settings: &BuildSettings) -> String {
        let heap_kb = settings.build.library_heap_kb;
        let mut out = String::new();
        out.push_str("/* Generated by glint. Edits are overwritten on the next library build. */\n");
        out.push_str("#ifndef LV_CONF_H\n#define LV_CONF_H\n\n");
        out.push_str("#define LV_COLOR_DEPTH 32\n");
        match self {
            DriverProfile::Legacy => {
                out.push_str("#define LV_MEM_CUSTOM 0\n");
                out.push_str(&format!("#define LV_MEM_SIZE ({heap_kb}U * 1024U)\n"));
                out.push_str("#define LV_TICK_CUSTOM 0\n");
                out.push_str("#define LV_DPI_DEF 130\n");
            }
            DriverProfile::Builtin => {
                out.push_str("#define LV_USE_STDLIB_MALLOC LV_STDLIB_BUILTIN\n");
                out.push_str(&format!("#define LV_MEM_SIZE ({heap_kb}U * 1024U)\n"));
                out.push_str("#define LV_USE_OS LV_OS_NONE\n");
                out.push_str("#define LV_USE_SDL 1\n");
                out.push_str("#define LV_SDL_INCLUDE_PATH <SDL2/SDL.h>\n");
            }
        }
        out.push_str("#define LV_USE_LOG 1\n");
        out.push_str("#define LV_LOG_PRINTF 1\n");
        out.push_str("#define LV_FONT_MONTSERRAT_14 1\n");
        out.push_str("#define LV_FONT_DEFAULT &lv_font_montserrat_14\n");
        out.push_str("\n#endif /* LV_CONF_H */\n");
        out
    }

    /// Renders `lv_drv_conf.h` for the display geometry; `None` when the
    /// profile has no driver package.
    pub fn render_drv_conf(self, settings: &BuildSettings) -> Option<String> {
        if !self.needs_driver_package() {
            return None;
        }
        let (w, h) = (settings.display.width, settings.display.height);
        Some(format!(
            "/* Generated by glint. */\n\
             #ifndef LV_DRV_CONF_H\n\
             #define LV_DRV_CONF_H\n\
             \n\
             #include \"lv_conf.h\"\n\
             \n\
             #define USE_SDL 1\n\
             #define SDL_HOR_RES {w}\n\
             #define SDL_VER_RES {h}\n\
             #define SDL_ZOOM 1\n\
             #define SDL_DOUBLE_BUFFERED 0\n\
             #define SDL_INCLUDE_PATH <SDL2/SDL.h>\n\
             #define SDL_DUAL_DISPLAY 0\n\
             \n\
             #endif /* LV_DRV_CONF_H */\n"
        ))
    }

    /// Renders the entry point that initialises the display and calls the
    /// user's `create_ui()`.
    pub fn render_harness(self, settings: &BuildSettings) -> String {
        let (w, h) = (settings.display.width, settings.display.height);
        match self {
            DriverProfile::Legacy => format!(
                r#"/* Generated by glint. */
#include <emscripten.h>
#include "lvgl.h"
#include "sdl/sdl.h"

#define DISP_HOR_RES {w}
#define DISP_VER_RES {h}

void create_ui(void);

static lv_color_t buf[DISP_HOR_RES * 100];
static lv_disp_draw_buf_t draw_buf;
static double last_tick;

static void loop(void)
{{
    double now = emscripten_get_now();
    lv_tick_inc((uint32_t)(now - last_tick));
    last_tick = now;
    lv_timer_handler();
}}

int main(void)
{{
    lv_init();
    sdl_init();

    lv_disp_draw_buf_init(&draw_buf, buf, NULL, DISP_HOR_RES * 100);

    static lv_disp_drv_t disp_drv;
    lv_disp_drv_init(&disp_drv);
    disp_drv.draw_buf = &draw_buf;
    disp_drv.flush_cb = sdl_display_flush;
    disp_drv.hor_res = DISP_HOR_RES;
    disp_drv.ver_res = DISP_VER_RES;
    lv_disp_drv_register(&disp_drv);

    static lv_indev_drv_t indev_drv;
    lv_indev_drv_init(&indev_drv);
    indev_drv.type = LV_INDEV_TYPE_POINTER;
    indev_drv.read_cb = sdl_mouse_read;
    lv_indev_drv_register(&indev_drv);

    create_ui();

    last_tick = emscripten_get_now();
    emscripten_set_main_loop(loop, 0, 1);
    return 0;
}}
"#
            ),
            DriverProfile::Builtin => format!(
                r#"/* Generated by glint. */
#include <emscripten.h>
#include "lvgl.h"

#define DISP_HOR_RES {w}
#define DISP_VER_RES {h}

void create_ui(void);

static uint32_t tick_get(void)
{{
    return (uint32_t)emscripten_get_now();
}}

static void loop(void)
{{
    lv_timer_handler();
}}

int main(void)
{{
    lv_init();
    lv_tick_set_cb(tick_get);

    lv_sdl_window_create(DISP_HOR_RES, DISP_VER_RES);
    lv_sdl_mouse_create();

    create_ui();

    emscripten_set_main_loop(loop, 0, 1);
    return 0;
}}
"#
            ),
        }
    }
}

/// Collects `.c` files under `dir` recursively, in path order.
///
/// A missing directory yields an empty list.
pub(crate) fn c_sources(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            BuildError::io(path, std::io::Error::other(e))
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "c")
        {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}
