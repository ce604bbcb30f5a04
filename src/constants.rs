//! Centralized constants for hearth.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

use std::time::Duration;

/// Application name used in CLI output.
pub const APP_NAME: &str = "hearth";

/// Name given to the agent resource created on the remote service.
pub const AGENT_NAME: &str = "hearth-home-agent";

/// API version sent with every agent-service request.
pub const API_VERSION: &str = "2025-05-01";

/// Default question for `hearth ask` when no prompt is given.
pub const DEFAULT_PROMPT: &str = "Qué temperatura hace en el salón?";

/// Delay between run-status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Overall deadline for a single turn's polling loop.
///
/// A run still non-terminal after this long surfaces as a timeout error
/// rather than polling forever.
pub const TURN_POLL_DEADLINE: Duration = Duration::from_secs(300);

/// OAuth scope requested from the host credential chain.
pub const TOKEN_SCOPE: &str = "https://ai.azure.com/.default";

/// Environment variable consulted for a pre-issued access token.
pub const TOKEN_ENV_VAR: &str = "AZURE_AI_TOKEN";

/// Default bind host for `hearth serve`.
pub const SERVE_DEFAULT_HOST: &str = "127.0.0.1";

/// Default port for `hearth serve`.
pub const SERVE_DEFAULT_PORT: u16 = 8000;

// --- Required environment variables ---

pub const ENV_PROJECT_ENDPOINT: &str = "PROJECT_ENDPOINT";
pub const ENV_MODEL_DEPLOYMENT: &str = "MODEL_DEPLOYMENT_NAME";
pub const ENV_MCP_SERVER_URL: &str = "MCP_SERVER_URL";
pub const ENV_MCP_SERVER_LABEL: &str = "MCP_SERVER_LABEL";
pub const ENV_MCP_SERVER_TOKEN: &str = "MCP_SERVER_TOKEN";

/// Instructions template for the created agent.
///
/// `{url}` and `{label}` are replaced with the configured MCP server
/// endpoint and label at agent creation.
pub const AGENT_INSTRUCTIONS: &str = "You are a helpful agent that can use MCP tools to assist users. \
You have access to a Home Assistant MCP server at {url} with label '{label}'. \
Use the available MCP tools to answer questions about home automation, sensor data, and device control. \
When making MCP calls, ensure you use the proper authentication headers that have been configured.";
