//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use powerprobe_core::config::MAX_BUILD_TIMEOUT_SECS;

/// powerprobe -- Block Storage volume waits and driver validation scenarios.
///
/// Use `powerprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "powerprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the powerprobe.toml configuration file.
    #[arg(short, long, default_value = "powerprobe.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for a volume to reach a status or disappear.
    Wait(WaitArgs),

    /// Run validation scenarios against the configured cloud.
    Run(RunArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- wait ----

/// Poll a volume until it reaches the requested state.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Volume ID to watch.
    pub volume_id: String,

    /// Target status (case-insensitive).
    #[arg(long, default_value = "available", conflicts_with = "deleted")]
    pub status: String,

    /// Wait until the volume no longer exists.
    #[arg(long)]
    pub deleted: bool,

    /// Override `[volume] build_timeout_secs`.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_BUILD_TIMEOUT_SECS))]
    pub timeout_secs: Option<u64>,
}

// ---- run ----

/// Run one scenario or all of them.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario name (failover-powerstore, failover-powerflex, volume-type, qos, migration) or `all`.
    pub scenario: String,
}

// ---- config ----

/// Manage powerprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, cloud, volume, features, migration, powerstore, powerflex).
        #[arg(long)]
        section: Option<String>,
    },
}
