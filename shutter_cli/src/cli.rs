//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective run cap of the current move (for JSON error details).
pub static LAST_MAX_RUN_MS: OnceLock<u64> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "shutter", version, about = "Roller shutter controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/shutter.toml")]
    pub config: PathBuf,

    /// Emit JSON (logs, results and errors) instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move the shutter to a level (0 = open, 100 = closed) and wait until it settles
    Move {
        /// Target level in percent
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
        /// Run the simulated relay on virtual time (finishes instantly)
        #[arg(long, action = ArgAction::SetTrue)]
        fast: bool,
        /// Override runner.max_run_ms for this move
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
    },
    /// Show the persisted position and course times
    Status,
    /// Decode a packed state value without touching any hardware
    Decode {
        /// Packed state, up to 20 decimal digits
        state: String,
    },
    /// Halt the motor and forget the persisted position
    Reset,
    /// Quick health check (config, relay and state file)
    SelfCheck,
}

impl Commands {
    /// Commands that work without a config file.
    pub fn needs_config(&self) -> bool {
        !matches!(self, Commands::Decode { .. })
    }
}
