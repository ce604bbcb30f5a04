//! HTTP client for the agent-service REST API.
//!
//! [`AgentsClient`] wraps a `reqwest::Client` with pre-built headers and the
//! project endpoint. Every operation is a single request with a typed
//! response; failures surface the remote status and body and are never
//! retried here.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::wire::{
    Agent, AgentThread, CreateAgentRequest, CreateMessageRequest, CreateRunRequest, MessageList,
    MessageRole, Run, RunStepList, SubmitApprovalsRequest, ThreadMessage, ToolApproval,
    ToolResources,
};
use crate::constants::API_VERSION;
use crate::credentials::{CredentialError, TokenCredential};

/// Failure talking to the agent service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication failed: {0}")]
    Auth(#[from] CredentialError),
    #[error("service returned {status} for {method} {path}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not build auth header: {0}")]
    Header(#[from] header::InvalidHeaderValue),
}

/// Typed client for one agent-service project.
#[derive(Clone)]
pub struct AgentsClient {
    http: reqwest::Client,
    headers: HeaderMap,
    endpoint: String,
}

impl AgentsClient {
    /// Resolves a token from the credential chain and builds a client.
    pub async fn connect(
        endpoint: &str,
        credential: &dyn TokenCredential,
    ) -> Result<Self, ServiceError> {
        let token = credential.token().await?;
        Self::with_token(endpoint, &token.token)
    }

    /// Builds a client around an already-resolved bearer token.
    pub fn with_token(endpoint: &str, token: &str) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse::<HeaderValue>()?,
        );
        Ok(Self {
            http: reqwest::Client::new(),
            headers,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// The project endpoint this client talks to.
    #[cfg(test)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&impl Serialize>,
    ) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .headers(self.headers.clone())
            .query(&[("api-version", API_VERSION)])
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ServiceError::Transport {
            path: path.to_string(),
            source,
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| ServiceError::Transport {
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(ServiceError::Status {
                method,
                path: path.to_string(),
                status,
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|source| ServiceError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ServiceError> {
        self.request(Method::GET, path, query, None::<&()>).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ServiceError> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// Creates an agent bound to a model deployment and tool declarations.
    ///
    /// Each session creates its own agent; reusing a pre-existing agent by
    /// id is possible on the service side but not part of this client.
    pub async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent, ServiceError> {
        self.post("/assistants", request).await
    }

    /// Creates a new empty conversation thread.
    pub async fn create_thread(&self) -> Result<AgentThread, ServiceError> {
        self.post("/threads", &serde_json::json!({})).await
    }

    /// Posts a message into a thread.
    pub async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage, ServiceError> {
        self.post(
            &format!("/threads/{thread_id}/messages"),
            &CreateMessageRequest {
                role,
                content: content.to_string(),
            },
        )
        .await
    }

    /// Starts a run of the agent against the thread's current messages.
    pub async fn create_run(
        &self,
        thread_id: &str,
        agent_id: &str,
        tool_resources: Option<ToolResources>,
    ) -> Result<Run, ServiceError> {
        self.post(
            &format!("/threads/{thread_id}/runs"),
            &CreateRunRequest {
                assistant_id: agent_id.to_string(),
                tool_resources,
            },
        )
        .await
    }

    /// Reads the current state of a run.
    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError> {
        self.get(&format!("/threads/{thread_id}/runs/{run_id}"), &[])
            .await
    }

    /// Cancels a run that cannot make progress.
    pub async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError> {
        self.post(
            &format!("/threads/{thread_id}/runs/{run_id}/cancel"),
            &serde_json::json!({}),
        )
        .await
    }

    /// Submits approvals for the run's pending tool calls.
    pub async fn submit_tool_approvals(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_approvals: Vec<ToolApproval>,
    ) -> Result<Run, ServiceError> {
        self.post(
            &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &SubmitApprovalsRequest { tool_approvals },
        )
        .await
    }

    /// Lists a thread's messages, newest first.
    pub async fn list_messages(&self, thread_id: &str) -> Result<MessageList, ServiceError> {
        self.get(&format!("/threads/{thread_id}/messages"), &[("order", "desc")])
            .await
    }

    /// Lists the steps a run went through, including tool calls.
    pub async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunStepList, ServiceError> {
        self.get(&format!("/threads/{thread_id}/runs/{run_id}/steps"), &[])
            .await
    }
}
