//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Blink Sync - align camera blinks with EEG headband blink artifacts
#[derive(Parser, Debug)]
#[command(
    name = "blink-sync",
    author,
    version,
    about = "Camera / EEG blink synchronization",
    long_about = "Aligns a camera-detected eye blink with the blink artifact seen by an EEG \n\
                  headband and records the EEG sample index at the match.\n\n\
                  Scenarios replay a scripted camera/headband timeline through the \n\
                  same state machine the live devices would drive."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BLINK_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BLINK_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default filter level derived from -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario through one blink sync session
    Run(RunArgs),

    /// Validate configuration (and optionally a scenario) without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "blink_sync.toml",
        env = "BLINK_SYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Scenario timeline to replay (TOML or JSON)
    #[arg(short, long, env = "BLINK_SYNC_SCENARIO")]
    pub scenario: PathBuf,

    /// Give up waiting for the outcome after this many seconds (0 = derive from config)
    #[arg(long, default_value = "0", env = "BLINK_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate inputs and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BLINK_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "blink_sync.toml")]
    pub config: PathBuf,

    /// Scenario file to validate alongside the configuration
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "blink_sync.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show timer durations for every state
    #[arg(long)]
    pub timers: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
