//! Connect N - command-line entry point
//!
//! Runs the WebSocket game server or prints the effective configuration.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, SettingsArgs};
use connect_n::GameServer;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => run_server(args).await,
        Command::Config(args) => print_config(args),
    }
}

/// Run the WebSocket game server until Ctrl-C.
#[instrument(skip_all)]
async fn run_server(args: SettingsArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,connect_n=debug")),
        )
        .init();

    let settings = args.load()?;
    let game = settings.game();
    info!(
        rows = game.rows().get(),
        columns = game.columns().get(),
        win_length = game.win_length().get(),
        "Starting connect-N server"
    );

    let addr = format!("{}:{}", settings.server().host(), settings.server().port());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    GameServer::new(&settings)
        .serve(listener, shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Print the settings that `serve` would use.
fn print_config(args: SettingsArgs) -> Result<()> {
    let settings = args.load()?;
    print!("{}", settings.to_toml()?);
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
}
