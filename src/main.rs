//! Entry point for ferret, a terminal research agent that plans MCP tool
//! calls with a language model.
//!
//! This binary loads environment variables, sets up logging, parses CLI
//! arguments via [`cli`], and dispatches to the appropriate subcommand handler.

mod agent;
mod archive;
mod backend;
mod cli;
mod config;
mod constants;
mod error;
mod format;
mod mcp;
mod message;
mod output;
mod plan;
mod workflow;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Runs the ferret CLI.
///
/// Loads `.env` files (silently ignored if absent), installs a stderr
/// `tracing` subscriber filtered by `FERRET_LOG`, parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_env("FERRET_LOG")
        .unwrap_or_else(|_| EnvFilter::new(constants::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = cli::parse();
    cli::run(cli).await
}
