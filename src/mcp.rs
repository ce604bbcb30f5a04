//! MCP tool-provider declaration.
//!
//! [`McpTool`] captures what the agent service needs to reach a remote MCP
//! server: a label, the server URL, and optional auth headers. It produces
//! the tool definitions sent at agent creation and the per-run resources
//! that disable human approval prompts; the same headers are re-sent with
//! every tool-call approval.

use std::collections::BTreeMap;

use crate::agents::wire::{McpToolDefinition, McpToolResource, ToolResources};
use crate::config::Settings;

/// Approval mode asking the service to never require human sign-off.
const APPROVAL_NEVER: &str = "never";

/// A declared MCP tool server.
#[derive(Debug, Clone)]
pub struct McpTool {
    server_label: String,
    server_url: String,
    headers: BTreeMap<String, String>,
}

impl McpTool {
    pub fn new(server_label: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            server_label: server_label.into(),
            server_url: server_url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Builds the tool from loaded settings, attaching the bearer token
    /// when one is configured.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut tool = Self::new(&settings.mcp_server_label, &settings.mcp_server_url);
        if let Some(ref token) = settings.mcp_server_token {
            tool = tool.with_bearer_token(token);
        }
        tool
    }

    /// Adds an `Authorization: Bearer …` header for the MCP server.
    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.headers
            .insert("Authorization".to_string(), format!("Bearer {token}"));
        self
    }

    pub fn server_label(&self) -> &str {
        &self.server_label
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Headers re-sent with every tool-call approval.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Tool definitions included in the agent-creation request.
    pub fn definitions(&self) -> Vec<McpToolDefinition> {
        vec![McpToolDefinition {
            kind: "mcp".to_string(),
            server_label: self.server_label.clone(),
            server_url: self.server_url.clone(),
        }]
    }

    /// Per-run tool resources with approval prompts disabled.
    pub fn resources(&self) -> ToolResources {
        ToolResources {
            mcp: vec![McpToolResource {
                server_label: self.server_label.clone(),
                headers: self.headers.clone(),
                require_approval: APPROVAL_NEVER.to_string(),
            }],
        }
    }
}
