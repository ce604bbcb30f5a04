//! Host credential resolution for the agent service.
//!
//! The service authenticates with a bearer token from the hosting platform's
//! identity, not an API key. [`TokenCredential`] is the injected seam: the
//! session manager takes any implementation, so tests run against a
//! [`StaticCredential`] while the real binary walks [`ChainCredential`] —
//! an explicit token env var first, then the Azure CLI.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::constants::{TOKEN_ENV_VAR, TOKEN_SCOPE};

/// A bearer token with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Failure to resolve a credential from the host environment.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential available: {0}. Run `az login` (or set {TOKEN_ENV_VAR}) and retry")]
    Unavailable(String),
    #[error("credential helper failed: {0}")]
    Helper(String),
}

/// Capability for obtaining an access token for the agent service.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Resolves a bearer token scoped to the agent service.
    async fn token(&self) -> Result<AccessToken, CredentialError>;
}

/// Reads a pre-issued token from the `AZURE_AI_TOKEN` environment variable.
pub struct EnvCredential;

#[async_trait]
impl TokenCredential for EnvCredential {
    async fn token(&self) -> Result<AccessToken, CredentialError> {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => Ok(AccessToken {
                token,
                // Env tokens carry no metadata; assume a standard hour.
                expires_at: Utc::now() + Duration::hours(1),
            }),
            _ => Err(CredentialError::Unavailable(format!(
                "{} is not set",
                TOKEN_ENV_VAR
            ))),
        }
    }
}

/// Obtains a token from the logged-in Azure CLI (`az account get-access-token`).
pub struct AzureCliCredential;

/// Shape of the Azure CLI's token output.
#[derive(serde::Deserialize)]
struct CliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "expiresOn")]
    expires_on: String,
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn token(&self) -> Result<AccessToken, CredentialError> {
        let output = tokio::process::Command::new("az")
            .args(["account", "get-access-token", "--scope", TOKEN_SCOPE])
            .output()
            .await
            .map_err(|e| CredentialError::Unavailable(format!("failed to run `az`: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CredentialError::Helper(stderr.trim().to_string()));
        }

        let parsed: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| CredentialError::Helper(format!("unexpected `az` output: {e}")))?;

        // `expiresOn` is local time without an offset ("YYYY-MM-DD HH:MM:SS").
        let expires_at = chrono::NaiveDateTime::parse_from_str(
            parsed.expires_on.split('.').next().unwrap_or_default(),
            "%Y-%m-%d %H:%M:%S",
        )
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now() + Duration::minutes(30));

        Ok(AccessToken {
            token: parsed.access_token,
            expires_at,
        })
    }
}

/// Tries each credential in order, returning the first success.
///
/// Mirrors the platform's default credential chain: an explicit token env
/// var wins, then the Azure CLI login.
pub struct ChainCredential {
    sources: Vec<Box<dyn TokenCredential>>,
}

impl ChainCredential {
    /// The default chain: [`EnvCredential`] then [`AzureCliCredential`].
    pub fn default_chain() -> Self {
        Self::new(vec![Box::new(EnvCredential), Box::new(AzureCliCredential)])
    }

    pub fn new(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl TokenCredential for ChainCredential {
    async fn token(&self) -> Result<AccessToken, CredentialError> {
        let mut reasons = Vec::new();
        for source in &self.sources {
            match source.token().await {
                Ok(token) => return Ok(token),
                Err(e) => reasons.push(e.to_string()),
            }
        }
        Err(CredentialError::Unavailable(reasons.join("; ")))
    }
}

/// Fixed token, so credential-dependent code is testable without a real
/// cloud identity.
#[cfg(test)]
pub struct StaticCredential {
    token: String,
}

#[cfg(test)]
impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl TokenCredential for StaticCredential {
    async fn token(&self) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }
}
