//! Glint CLI: compiles LVGL UI sources into a web module.
//!
//! Provides `glint build` for compiling a UI file or project, `glint clean`
//! for discarding cached objects and library builds, and `glint key` for
//! printing the library build key the current settings select.

#![warn(missing_docs)]

mod build;
mod clean;
mod logging;
mod session;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Glint, an incremental LVGL-to-WebAssembly builder.
#[derive(Parser, Debug)]
#[command(name = "glint", version, about = "Glint LVGL web builder")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `glint.toml` settings file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a UI source (or the project it belongs to) into a web module.
    Build(BuildArgs),
    /// Delete cached objects and library builds.
    Clean(ProjectArgs),
    /// Print the library build key for the current settings.
    Key(ProjectArgs),
}

/// Arguments for the `glint build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// The UI source file. A `glint.json` above it turns the build into a project build.
    pub file: PathBuf,

    /// Output format for the build result.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for commands that operate on a project directory.
#[derive(Parser, Debug)]
pub struct ProjectArgs {
    /// Project directory (defaults to the current directory).
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Build result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable diagnostics.
    Text,
    /// The full result as one JSON document.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom settings file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    if let Err(e) = logging::init(&global) {
        eprintln!("warning: {e}");
    }

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Clean(ref args) => clean::run_clean(args, &global),
        Command::Key(ref args) => clean::run_key(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
