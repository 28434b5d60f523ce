//! lxcward -- command-line entry point
//!
//! Parses arguments, loads configuration, initialises tracing, builds the
//! reconciler and dispatches to one handler per subcommand.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing::Instrument;

use lxcward_core::config::GeneralConfig;
use lxcward_reconciler::Reconciler;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    match run(cli, &writer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            use colored::Colorize;
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    let command_name = cli.command.name();

    // config subcommands report load failures themselves
    if let Commands::Config(args) = cli.command {
        let mut general = GeneralConfig::default();
        if let Some(level) = cli.log_level {
            general.log_level = level;
        }
        init_logging(&general)?;
        let span = tracing::info_span!(
            "lxcward",
            trace_id = %uuid::Uuid::new_v4(),
            command = command_name
        );
        return commands::config::execute(args, &cli.config, writer)
            .instrument(span)
            .await;
    }

    let mut config = commands::load_config(&cli.config).await?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    init_logging(&config.general)?;
    lxcward_core::metrics::describe_all();

    let span = tracing::info_span!(
        "lxcward",
        trace_id = %uuid::Uuid::new_v4(),
        command = command_name
    );

    async move {
        tracing::debug!(config = %cli.config.display(), "lxcward starting");
        let reconciler = Reconciler::from_config(&config)?;

        match cli.command {
            Commands::Status(args) => commands::status::execute(args, &reconciler, writer).await,
            Commands::EnsureRunning(args) => {
                commands::ensure::execute(args, &reconciler, writer).await
            }
            Commands::Exec(args) => commands::exec::execute(args, &reconciler, writer).await,
            Commands::MakePrivileged(args) => {
                commands::privilege::execute(args, &reconciler, writer).await
            }
            Commands::Validate(args) => {
                commands::validate::execute(args, &reconciler, writer).await
            }
            Commands::Config(_) => Ok(()),
        }
    }
    .instrument(span)
    .await
}

fn init_logging(general: &GeneralConfig) -> Result<(), CliError> {
    logging::init_tracing(general).map_err(|e| CliError::Logging(format!("{e:#}")))
}
