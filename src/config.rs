//! Connection settings for hearth.
//!
//! Everything hearth needs to reach the agent service and declare the MCP
//! tool server comes from five environment variables, read once at startup
//! and never mutated. There is no config file: a missing required value is
//! a fatal error reported before any network call.

use anyhow::Result;

use crate::constants::{
    ENV_MCP_SERVER_LABEL, ENV_MCP_SERVER_TOKEN, ENV_MCP_SERVER_URL, ENV_MODEL_DEPLOYMENT,
    ENV_PROJECT_ENDPOINT,
};

/// Immutable connection settings, loaded once at process start.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base endpoint of the agent-service project.
    pub project_endpoint: String,
    /// Deployment name of the model the agent is bound to.
    pub model_deployment: String,
    /// URL of the MCP tool server the agent may call.
    pub mcp_server_url: String,
    /// Label identifying the MCP tool server on the service side.
    pub mcp_server_label: String,
    /// Optional bearer token for the MCP tool server.
    ///
    /// When absent the tool attachment carries no auth headers.
    pub mcp_server_token: Option<String>,
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming every missing required variable. Configuration
    /// errors are not transient, so there is no retry.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an injected lookup function.
    ///
    /// `from_env` delegates here; tests pass a closure over a map instead of
    /// mutating the real process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = [
            ENV_PROJECT_ENDPOINT,
            ENV_MODEL_DEPLOYMENT,
            ENV_MCP_SERVER_URL,
            ENV_MCP_SERVER_LABEL,
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        Ok(Self {
            project_endpoint: normalize_endpoint(&get(ENV_PROJECT_ENDPOINT).unwrap()),
            model_deployment: get(ENV_MODEL_DEPLOYMENT).unwrap(),
            mcp_server_url: get(ENV_MCP_SERVER_URL).unwrap(),
            mcp_server_label: get(ENV_MCP_SERVER_LABEL).unwrap(),
            mcp_server_token: get(ENV_MCP_SERVER_TOKEN),
        })
    }

    /// Instructions for the created agent, with the MCP server details
    /// substituted in.
    pub fn agent_instructions(&self) -> String {
        crate::constants::AGENT_INSTRUCTIONS
            .replace("{url}", &self.mcp_server_url)
            .replace("{label}", &self.mcp_server_label)
    }
}

/// Strips trailing slashes so path joins in the client stay predictable.
fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_PROJECT_ENDPOINT, "https://proj.example.com/api/projects/demo"),
            (ENV_MODEL_DEPLOYMENT, "gpt-4o"),
            (ENV_MCP_SERVER_URL, "https://mcp.example.com/sse"),
            (ENV_MCP_SERVER_LABEL, "home_assistant"),
            (ENV_MCP_SERVER_TOKEN, "secret-token"),
        ])
    }

    fn lookup<'a>(env: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        |key| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn loads_complete_settings() {
        let env = full_env();
        let settings = Settings::from_lookup(lookup(&env)).unwrap();
        assert_eq!(settings.model_deployment, "gpt-4o");
        assert_eq!(settings.mcp_server_label, "home_assistant");
        assert_eq!(settings.mcp_server_token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn token_is_optional() {
        let mut env = full_env();
        env.remove(ENV_MCP_SERVER_TOKEN);
        let settings = Settings::from_lookup(lookup(&env)).unwrap();
        assert!(settings.mcp_server_token.is_none());
    }

    #[test]
    fn missing_model_deployment_is_fatal() {
        let mut env = full_env();
        env.remove(ENV_MODEL_DEPLOYMENT);
        let err = Settings::from_lookup(lookup(&env)).unwrap_err();
        assert!(err.to_string().contains(ENV_MODEL_DEPLOYMENT));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert(ENV_MCP_SERVER_URL, "  ");
        let err = Settings::from_lookup(lookup(&env)).unwrap_err();
        assert!(err.to_string().contains(ENV_MCP_SERVER_URL));
    }

    #[test]
    fn all_missing_are_named_at_once() {
        let err = Settings::from_lookup(|_| None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENV_PROJECT_ENDPOINT));
        assert!(msg.contains(ENV_MODEL_DEPLOYMENT));
        assert!(msg.contains(ENV_MCP_SERVER_URL));
        assert!(msg.contains(ENV_MCP_SERVER_LABEL));
    }

    #[test]
    fn endpoint_trailing_slash_is_stripped() {
        let mut env = full_env();
        env.insert(ENV_PROJECT_ENDPOINT, "https://proj.example.com/");
        let settings = Settings::from_lookup(lookup(&env)).unwrap();
        assert_eq!(settings.project_endpoint, "https://proj.example.com");
    }

    #[test]
    fn instructions_substitute_server_details() {
        let env = full_env();
        let settings = Settings::from_lookup(lookup(&env)).unwrap();
        let instructions = settings.agent_instructions();
        assert!(instructions.contains("https://mcp.example.com/sse"));
        assert!(instructions.contains("'home_assistant'"));
    }
}
