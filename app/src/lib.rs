//! Lookout application shell.
//!
//! This is the thin binary layer: CLI parsing, logging setup, config
//! loading and wiring. Scan logic lives in the `crates/` directory.

pub mod cli;
pub mod commands;
pub mod state;

use anyhow::Result;
use cli::{Cli, Command};
use lookout_core::AppConfig;
use state::AppState;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Initialize tracing subscriber for logging
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lookout=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    info!("Starting lookout v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env(cli.config.as_deref())?;
    let state = Arc::new(AppState::new(config).await?);

    let code = match cli.command {
        Command::Run => commands::daemon(Arc::clone(&state)).await?,
        Command::Scan { platforms } => {
            let outcome = commands::scan(&state, &platforms).await;
            state.shutdown().await;
            outcome?
        }
        Command::Platforms => {
            commands::platforms(&state);
            ExitCode::SUCCESS
        }
        Command::Leads { limit } => {
            commands::leads(&state, limit).await?;
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
