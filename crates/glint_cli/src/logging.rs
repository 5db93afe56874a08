//! Tracing subscriber setup.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::GlobalArgs;

/// Crates whose events are shown by default.
const CRATES: [&str; 7] = [
    "glint",
    "glint_cli",
    "glint_build",
    "glint_cache",
    "glint_config",
    "glint_toolchain",
    "glint_diagnostics",
];

/// The default filter for the given verbosity; `RUST_LOG` overrides it.
pub fn default_directives(global: &GlobalArgs) -> String {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    };
    CRATES
        .iter()
        .map(|c| format!("{c}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs a compact stderr subscriber.
pub fn init(global: &GlobalArgs) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(global)))
        .map_err(|e| format!("failed to create tracing filter: {e}"))?;

    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(global.verbose);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| format!("failed to install tracing subscriber: {e}"))
}
