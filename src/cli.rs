//! CLI module for Pulse
//!
//! A server binary only needs one command, so `serve` is the default when
//! no subcommand is given.

use clap::{Parser, Subcommand};

/// Pulse event bus CLI
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(about = "Durable event bus with live WebSocket fan-out")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) | None => crate::server::run().await,
    }
}
