//! Agent session management.
//!
//! An [`AgentSession`] is the explicit per-session context: it owns the
//! agent and thread handles created on the remote service and the
//! one-active-run-per-thread invariant. The batch flow holds one for the
//! process lifetime; the web flow holds one per chat connection. Nothing is
//! shared across sessions and nothing lives at module level.

mod turn;

pub use turn::{TurnError, TurnReply};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::agents::wire::{Agent, AgentThread, CreateAgentRequest, MessageList, RunStepList};
use crate::agents::{AgentsClient, ServiceError};
use crate::config::Settings;
use crate::constants::{AGENT_NAME, POLL_INTERVAL, TURN_POLL_DEADLINE};
use crate::mcp::McpTool;

/// Per-session context: one agent, one thread, at most one active run.
pub struct AgentSession {
    client: AgentsClient,
    mcp: McpTool,
    model_deployment: String,
    instructions: String,
    agent: Option<Agent>,
    thread: Option<AgentThread>,
    /// Set while a turn is in flight; a second turn is rejected, not queued.
    in_flight: AtomicBool,
    poll_interval: Duration,
    poll_deadline: Duration,
}

impl AgentSession {
    /// Builds an unconnected session from loaded settings.
    pub fn new(client: AgentsClient, settings: &Settings) -> Self {
        Self {
            client,
            mcp: McpTool::from_settings(settings),
            model_deployment: settings.model_deployment.clone(),
            instructions: settings.agent_instructions(),
            agent: None,
            thread: None,
            in_flight: AtomicBool::new(false),
            poll_interval: POLL_INTERVAL,
            poll_deadline: TURN_POLL_DEADLINE,
        }
    }

    /// Builds a session and creates its agent and thread up front.
    pub async fn connect(client: AgentsClient, settings: &Settings) -> Result<Self, ServiceError> {
        let mut session = Self::new(client, settings);
        session.ensure_agent().await?;
        session.ensure_thread().await?;
        Ok(session)
    }

    /// Overrides the poll cadence; used by tests to avoid real sleeps.
    #[cfg(test)]
    pub fn with_polling(mut self, interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_deadline = deadline;
        self
    }

    /// Creates the agent on the remote service, or returns the handle
    /// created earlier in this session.
    ///
    /// Idempotent within a session: only the first call issues a create
    /// request, so repeated turns never multiply agent resources.
    pub async fn ensure_agent(&mut self) -> Result<&Agent, ServiceError> {
        if self.agent.is_none() {
            let agent = self
                .client
                .create_agent(&CreateAgentRequest {
                    model: self.model_deployment.clone(),
                    name: AGENT_NAME.to_string(),
                    instructions: self.instructions.clone(),
                    tools: self.mcp.definitions(),
                })
                .await?;
            self.agent = Some(agent);
        }
        Ok(self.agent.as_ref().unwrap())
    }

    /// Creates the session's conversation thread, once.
    ///
    /// The thread is reused across all turns of this session and never
    /// deleted client-side; retention is the service's business.
    pub async fn ensure_thread(&mut self) -> Result<&AgentThread, ServiceError> {
        if self.thread.is_none() {
            let thread = self.client.create_thread().await?;
            self.thread = Some(thread);
        }
        Ok(self.thread.as_ref().unwrap())
    }

    /// Id of the session's agent, once connected.
    pub fn agent_id(&self) -> Option<&str> {
        self.agent.as_ref().map(|a| a.id.as_str())
    }

    /// Id of the session's thread, once connected.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.id.as_str())
    }

    /// The MCP tool declaration this session attaches to its agent.
    pub fn mcp(&self) -> &McpTool {
        &self.mcp
    }

    /// Full conversation transcript, newest first.
    pub async fn transcript(&self) -> Result<MessageList, TurnError> {
        let thread_id = self.thread_id().ok_or(TurnError::NotConnected)?;
        Ok(self.client.list_messages(thread_id).await?)
    }

    /// Steps a finished run went through, for the tool-call summary.
    pub async fn run_steps(&self, run_id: &str) -> Result<RunStepList, TurnError> {
        let thread_id = self.thread_id().ok_or(TurnError::NotConnected)?;
        Ok(self.client.list_run_steps(thread_id, run_id).await?)
    }

    pub(crate) fn client(&self) -> &AgentsClient {
        &self.client
    }

    /// Marks a turn as in flight, rejecting overlap.
    pub(crate) fn begin_turn(&self) -> Result<TurnGuard<'_>, TurnError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TurnError::Busy);
        }
        Ok(TurnGuard {
            flag: &self.in_flight,
        })
    }
}

/// Clears the in-flight flag when a turn ends, on every exit path.
pub(crate) struct TurnGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests;
