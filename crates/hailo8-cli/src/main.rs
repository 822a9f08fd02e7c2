//! CLI entry point - the composition root.
//!
//! Parses arguments, loads configuration, starts logging and dispatches to
//! the handler for the requested command.

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;

use hailo8_cli::{Cli, CliConfig, CliContext, CliError, Commands, bootstrap, handlers, log_file_for};
use hailo8_runtime::init_logging;

async fn run(ctx: &CliContext, command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Install => handlers::install::execute(ctx).await,
        Commands::Status { json } => handlers::status::execute(ctx, json),
        Commands::Rollback => handlers::rollback::execute(ctx).await,
        Commands::Docker(args) => handlers::docker::execute(ctx, &args).await,
        Commands::Test { quick, report } => handlers::validate::execute(ctx, quick, report).await,
        Commands::Probe => handlers::probe::execute(ctx).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.resolved_command();

    let config = CliConfig {
        config_path: cli.config.clone(),
        install_dir: cli.install_dir.clone(),
    };
    let ctx = match bootstrap(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let log_file = log_file_for(&command, ctx.config(), Utc::now());
    let _guard = init_logging(cli.verbose, log_file.as_deref());

    match run(&ctx, command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(err.downcast_ref::<CliError>().map_or(1, CliError::exit_code))
        }
    }
}
