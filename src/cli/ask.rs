//! One-shot scripted exchange for `hearth ask`.
//!
//! Connects a session, drives a single turn, and prints the reply followed
//! by the run's tool-call steps and the full transcript. Exit status is 0 on
//! success and non-zero on any unhandled failure, via the `anyhow` chain
//! back to `main`.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::agents::AgentsClient;
use crate::config::Settings;
use crate::constants::{APP_NAME, DEFAULT_PROMPT};
use crate::credentials::ChainCredential;
use crate::output::{self, Renderer, StdoutRenderer};
use crate::session::AgentSession;

/// Runs the batch flow.
pub(crate) async fn run_ask(settings: Settings, prompt: Vec<String>) -> Result<()> {
    let prompt = if prompt.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        prompt.join(" ")
    };

    if settings.mcp_server_token.is_none() {
        eprintln!(
            "{} no MCP server token configured; the tool attachment will carry no auth headers",
            "warning:".yellow().bold()
        );
    }

    println!(
        "{} [model: {}]",
        APP_NAME.bold().cyan(),
        settings.model_deployment.yellow(),
    );
    println!();
    println!("{} {}", ">".green().bold(), prompt);
    println!();

    let mut renderer = StdoutRenderer::new();

    renderer.render_status("resolving credentials");
    let credential = ChainCredential::default_chain();
    let client = AgentsClient::connect(&settings.project_endpoint, &credential)
        .await
        .context("could not authenticate to the agent service")?;

    renderer.render_status("creating agent and thread");
    let session = AgentSession::connect(client, &settings)
        .await
        .context("could not create the agent session")?;
    println!(
        "{} agent {} / thread {} / mcp {} at {}",
        "session".dimmed(),
        session.agent_id().unwrap_or_default().cyan(),
        session.thread_id().unwrap_or_default().cyan(),
        session.mcp().server_label().yellow(),
        session.mcp().server_url().dimmed(),
    );
    println!();

    let reply = session.turn(&prompt).await?;
    renderer.render_reply(&reply.text());
    println!();

    let steps = session.run_steps(&reply.run_id).await?;
    output::print_run_steps(&steps);
    println!();

    let transcript = session.transcript().await?;
    output::print_transcript(&transcript);

    Ok(())
}
