//! Wire types for the agent-service REST API.
//!
//! These mirror the service's JSON shapes for agents, threads, messages,
//! runs, and tool approvals. Unknown enum values deserialize into catch-all
//! variants so new service-side vocabulary never breaks a poll loop.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An agent resource created on the remote service.
#[derive(Debug, Clone, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
}

/// A conversation thread owned by the remote service.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentThread {
    pub id: String,
}

/// The author of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    /// Any role this client does not know about.
    Unknown,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Unknown => "unknown",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::Unknown,
        }
    }
}

impl Serialize for MessageRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MessageRole::parse(&s))
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One content block of a thread message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

/// The text payload inside a `text` content block.
#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    pub value: String,
}

/// A role-tagged message belonging to a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// The message's last text block, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.iter().rev().find_map(|block| match block {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }
}

/// A page of thread messages, newest first when listed with `order=desc`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
}

/// Status vocabulary of a run, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelling,
    Cancelled,
    Expired,
    /// Any status this client does not know about; treated as non-terminal.
    Unknown,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "cancelling" => RunStatus::Cancelling,
            "cancelled" => RunStatus::Cancelled,
            "expired" => RunStatus::Expired,
            _ => RunStatus::Unknown,
        }
    }

    /// Whether the run will make no further progress.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }
}

impl<'de> Deserialize<'de> for RunStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RunStatus::parse(&s))
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error detail attached to a run that reached `failed`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A tool invocation the run is waiting on approval for.
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// The pending tool-call batch inside a `requires_action` run.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolApproval {
    #[serde(default)]
    pub tool_calls: Vec<RequiredToolCall>,
}

/// Action the service demands before the run can continue.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolApproval {
        submit_tool_approval: SubmitToolApproval,
    },
    #[serde(other)]
    Other,
}

/// A server-side execution of the agent against the thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Client approval for one pending tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolApproval {
    pub tool_call_id: String,
    pub approve: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// One step of a run, used for the batch flow's tool-call summary.
#[derive(Debug, Clone, Deserialize)]
pub struct RunStep {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub step_details: Option<StepDetails>,
}

/// Detail payload of a run step.
#[derive(Debug, Clone, Deserialize)]
pub struct StepDetails {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub tool_calls: Vec<StepToolCall>,
}

/// A tool call recorded in a run step.
#[derive(Debug, Clone, Deserialize)]
pub struct StepToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A page of run steps.
#[derive(Debug, Clone, Deserialize)]
pub struct RunStepList {
    #[serde(default)]
    pub data: Vec<RunStep>,
}

/// Declaration of an MCP tool sent at agent creation.
#[derive(Debug, Clone, Serialize)]
pub struct McpToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub server_label: String,
    pub server_url: String,
}

/// Per-run MCP resource: headers and approval mode for one server label.
#[derive(Debug, Clone, Serialize)]
pub struct McpToolResource {
    pub server_label: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub require_approval: String,
}

/// Tool resources attached to a run.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResources {
    pub mcp: Vec<McpToolResource>,
}

/// Request body for agent creation.
#[derive(Debug, Serialize)]
pub struct CreateAgentRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub tools: Vec<McpToolDefinition>,
}

/// Request body for posting a message to a thread.
#[derive(Debug, Serialize)]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

/// Request body for starting a run.
#[derive(Debug, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

/// Request body for submitting tool approvals.
#[derive(Debug, Serialize)]
pub struct SubmitApprovalsRequest {
    pub tool_approvals: Vec<ToolApproval>,
}
