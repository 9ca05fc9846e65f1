//! `domain-ledger` command-line entry point.
//!
//! Every command prints an `ApiResponse` JSON document on stdout; logs go to stderr.

mod commands;

use std::process::ExitCode;

use anyhow::Context;
use domain_ledger_app::{AppConfig, AppState};
use domain_ledger_core::error::CoreError;
use domain_ledger_core::types::ApiResponse;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{CommandLine, Commands};

fn init_logging(level: &str) {
    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn report_failure(error: CoreError) -> ExitCode {
    if error.is_expected() {
        tracing::warn!("{error}");
    } else {
        tracing::error!("{error}");
    }
    println!("{}", commands::render(&ApiResponse::<()>::failure(error)));
    ExitCode::FAILURE
}

async fn serve(state: &AppState) -> anyhow::Result<ExitCode> {
    let Some(handle) = state.start_scheduler() else {
        tracing::warn!("Nothing to serve: reconciliation is disabled");
        return Ok(ExitCode::SUCCESS);
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");
    handle.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = CommandLine::parse_args();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    init_logging(&config.log.level);

    let state = match AppState::open(config).await {
        Ok(state) => state,
        Err(e) => return Ok(report_failure(e)),
    };

    if matches!(cli.command, Commands::Serve) {
        return serve(&state).await;
    }

    match commands::execute(&state, cli.command).await {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(e)),
    }
}
