//! Result presentation for hearth.
//!
//! Defines the [`Renderer`] trait that decouples turn results from the
//! display layer. [`StdoutRenderer`] prints to the terminal for the batch
//! flow; the web flow renders the same data as chat frames instead.

use colored::Colorize;

use crate::agents::wire::{MessageList, MessageRole, RunStepList};

/// Trait for presenting turn results.
pub trait Renderer {
    /// Show a transient status line ("creating agent", "processing", …).
    fn render_status(&mut self, status: &str);

    /// Show the assistant's reply text.
    fn render_reply(&mut self, text: &str);

    /// Show a turn- or session-level error.
    fn render_error(&mut self, err: &str);
}

/// Renders turn results directly to the terminal.
pub struct StdoutRenderer;

impl StdoutRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdoutRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for StdoutRenderer {
    fn render_status(&mut self, status: &str) {
        println!("{}", status.dimmed());
    }

    fn render_reply(&mut self, text: &str) {
        println!("{text}");
    }

    fn render_error(&mut self, err: &str) {
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}

/// Prints the tool calls recorded in a run's steps.
pub fn print_run_steps(steps: &RunStepList) {
    for step in &steps.data {
        println!(
            "{} {} {}",
            "step".dimmed(),
            step.id.cyan(),
            step.status.dimmed()
        );
        if let Some(details) = &step.step_details {
            for call in &details.tool_calls {
                println!("  {} {} ({})", "tool call".dimmed(), call.id, call.kind);
            }
        }
    }
}

/// Prints the whole conversation, oldest first, with role labels.
pub fn print_transcript(messages: &MessageList) {
    println!("{}", "conversation".bold());
    println!("{}", "-".repeat(50).dimmed());
    for msg in messages.data.iter().rev() {
        let Some(text) = msg.text() else { continue };
        let label = match msg.role {
            MessageRole::User => "you".green().bold(),
            MessageRole::Assistant => "agent".cyan().bold(),
            MessageRole::Unknown => "??".yellow().bold(),
        };
        println!("{label}: {text}");
        println!("{}", "-".repeat(50).dimmed());
    }
}
