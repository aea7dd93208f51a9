//! powerprobe CLI entry point
//!
//! Parses arguments, loads `powerprobe.toml`, initializes logging and
//! dispatches to the subcommand handlers. Ctrl-C cancels in-flight waits.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use powerprobe_core::config::{GeneralConfig, PowerprobeConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load failures are reported by the command itself; logging falls back to defaults.
    let loaded = PowerprobeConfig::load(&cli.config).await;
    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }

    tracing::debug!(config = %cli.config.display(), "powerprobe starting");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            signal_cancel.cancel();
        }
    });

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
        Commands::Wait(args) => match loaded {
            Ok(config) => commands::wait::execute(args, &config, &cancel, &writer).await,
            Err(e) => Err(CliError::from(e)),
        },
        Commands::Run(args) => match loaded {
            Ok(config) => commands::run::execute(args, &config, &cancel, &writer).await,
            Err(e) => Err(CliError::from(e)),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
