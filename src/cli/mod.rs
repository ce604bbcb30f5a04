//! Command-line interface definition and dispatch for hearth.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler — the one-shot exchange lives in the [`ask`]
//! submodule, the web chat in [`crate::web`].

mod ask;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::constants::{SERVE_DEFAULT_HOST, SERVE_DEFAULT_PORT};

/// Top-level CLI structure for hearth.
#[derive(Parser)]
#[command(
    name = "hearth",
    about = "Chat with your smart home through a hosted AI agent and an MCP tool server"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the hearth CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by
/// clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Run one scripted exchange and print the reply
    Ask {
        /// The question to ask (defaults to the built-in sample question)
        prompt: Vec<String>,
    },
    /// Serve the web chat UI
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = SERVE_DEFAULT_PORT)]
        port: u16,
        /// Host to bind
        #[arg(long, default_value = SERVE_DEFAULT_HOST)]
        host: String,
    },
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
///
/// Settings are validated before anything touches the network; a missing
/// required variable fails here with no requests issued.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask { prompt } => {
            let settings = Settings::from_env()?;
            ask::run_ask(settings, prompt).await
        }
        Commands::Serve { port, host } => {
            // Server-side logging from RUST_LOG (default: info).
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();
            let settings = Settings::from_env()?;
            crate::web::serve(settings, &host, port).await
        }
    }
}
