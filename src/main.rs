//! Entry point for hearth, a chat client for a hosted AI agent wired to an
//! MCP tool server.
//!
//! This binary loads environment variables, parses CLI arguments via
//! [`cli`], and dispatches to either the one-shot `ask` flow or the web
//! chat server.

mod agents;
mod cli;
mod config;
mod constants;
mod credentials;
mod mcp;
mod output;
mod session;
mod web;

use anyhow::Result;

/// Runs the hearth CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`]. A returned error prints through anyhow and
/// exits non-zero.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    cli::run(cli).await
}
