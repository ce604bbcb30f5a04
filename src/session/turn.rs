//! The conversation driver: one user turn from message to reply.
//!
//! A turn posts the user message, starts a run, and polls it to a terminal
//! status on a fixed cadence with an overall deadline. Every
//! `requires_action` occurrence is answered by approving all of its pending
//! tool calls — no filtering, no prompting — so a run that asks N times
//! gets exactly N approval submissions.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use super::AgentSession;
use crate::agents::wire::{
    MessageRole, RequiredAction, Run, RunError, RunStatus, ThreadMessage, ToolApproval,
};
use crate::agents::ServiceError;

/// Failure of a single conversation turn.
///
/// The session itself stays usable after any of these; only the turn is
/// lost.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("a turn is already in flight for this thread")]
    Busy,
    #[error("session is not connected to an agent and thread")]
    NotConnected,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("run {run_id} ended {status}{}", fmt_run_error(.error))]
    RunFailed {
        run_id: String,
        status: RunStatus,
        error: Option<RunError>,
    },
    #[error("run {run_id} still not finished after {}s", .waited.as_secs())]
    Timeout { run_id: String, waited: Duration },
    #[error("run {run_id} requested approval with no pending tool calls")]
    EmptyApproval { run_id: String },
}

fn fmt_run_error(error: &Option<RunError>) -> String {
    match error {
        Some(e) => format!(": {e}"),
        None => String::new(),
    }
}

/// Result of a completed turn.
#[derive(Debug)]
pub struct TurnReply {
    /// Id of the run that produced the reply.
    pub run_id: String,
    /// Assistant messages produced by this turn, oldest first.
    pub messages: Vec<ThreadMessage>,
}

impl TurnReply {
    /// All reply text, one message per line group.
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .filter_map(|m| m.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl AgentSession {
    /// Runs one user turn: post the message, drive the run to completion,
    /// and return the assistant's reply messages.
    ///
    /// # Errors
    ///
    /// [`TurnError::Busy`] if another turn on this session is unresolved;
    /// [`TurnError::RunFailed`] if the run terminates in `failed`,
    /// `cancelled`, or `expired` (no messages are fetched then);
    /// [`TurnError::Timeout`] if the run outlives the poll deadline.
    pub async fn turn(&self, user_text: &str) -> Result<TurnReply, TurnError> {
        let _guard = self.begin_turn()?;
        let (Some(agent_id), Some(thread_id)) = (self.agent_id(), self.thread_id()) else {
            return Err(TurnError::NotConnected);
        };

        let user_message = self
            .client()
            .create_message(thread_id, MessageRole::User, user_text)
            .await?;

        let run = self
            .client()
            .create_run(thread_id, agent_id, Some(self.mcp().resources()))
            .await?;

        let run = self.poll_run(thread_id, run).await?;

        match run.status {
            RunStatus::Completed => {
                let replies = self.collect_replies(thread_id, &user_message.id).await?;
                Ok(TurnReply {
                    run_id: run.id,
                    messages: replies,
                })
            }
            status => Err(TurnError::RunFailed {
                run_id: run.id,
                status,
                error: run.last_error,
            }),
        }
    }

    /// Polls the run until it reaches a terminal status, approving every
    /// `requires_action` occurrence along the way.
    async fn poll_run(&self, thread_id: &str, mut run: Run) -> Result<Run, TurnError> {
        let started = Instant::now();

        while !run.status.is_terminal() {
            if started.elapsed() >= self.poll_deadline {
                return Err(TurnError::Timeout {
                    run_id: run.id,
                    waited: self.poll_deadline,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            run = self.client().get_run(thread_id, &run.id).await?;

            if run.status == RunStatus::RequiresAction {
                if let Some(RequiredAction::SubmitToolApproval {
                    submit_tool_approval,
                }) = run.required_action.take()
                {
                    run = self
                        .approve_pending(thread_id, &run.id, submit_tool_approval.tool_calls)
                        .await?;
                }
                // Other demanded actions are not ours to satisfy; keep
                // polling until the deadline surfaces the stall.
            }
        }

        Ok(run)
    }

    /// Approves all pending tool calls of one `requires_action` occurrence.
    ///
    /// A run demanding approval for zero calls cannot make progress; it is
    /// cancelled and surfaced as an error, matching the service's own
    /// guidance.
    async fn approve_pending(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_calls: Vec<crate::agents::wire::RequiredToolCall>,
    ) -> Result<Run, TurnError> {
        if tool_calls.is_empty() {
            self.client().cancel_run(thread_id, run_id).await?;
            return Err(TurnError::EmptyApproval {
                run_id: run_id.to_string(),
            });
        }

        let approvals: Vec<ToolApproval> = tool_calls
            .into_iter()
            .map(|call| ToolApproval {
                tool_call_id: call.id,
                approve: true,
                headers: self.mcp().headers().clone(),
            })
            .collect();

        Ok(self
            .client()
            .submit_tool_approvals(thread_id, run_id, approvals)
            .await?)
    }

    /// Fetches the thread and returns the assistant messages newer than the
    /// user message that opened this turn, oldest first.
    async fn collect_replies(
        &self,
        thread_id: &str,
        user_message_id: &str,
    ) -> Result<Vec<ThreadMessage>, TurnError> {
        let list = self.client().list_messages(thread_id).await?;
        let mut replies: Vec<ThreadMessage> = list
            .data
            .into_iter()
            .take_while(|m| m.id != user_message_id)
            .filter(|m| m.role == MessageRole::Assistant)
            .collect();
        // The list arrives newest first; present in conversation order.
        replies.reverse();
        Ok(replies)
    }
}
