use crate::config::Credential;
use crate::transport::{redact, Transport, TransportError};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde_json::Value;

/// `Transport` backed by an Octocrab client issuing raw GETs.
#[derive(Clone)]
pub struct GitHubTransport {
    octocrab: Octocrab,
}

impl GitHubTransport {
    /// `base_url` must match the one the analyzer builds URLs from; Octocrab routes
    /// every request to its configured base.
    pub fn new(credential: &Credential, base_url: &str) -> Result<Self, TransportError> {
        let octocrab = Octocrab::builder()
            .base_uri(base_url)?
            .personal_token(credential.expose().to_string())
            .add_retry_config(RetryConfig::None)
            .build()?;

        Ok(Self { octocrab })
    }
}

impl Transport for GitHubTransport {
    async fn fetch(&self, url: &str) -> Result<Value, TransportError> {
        tracing::debug!(url = %redact(url), "Sending GitHub API request");

        let response = self.octocrab._get(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = self.octocrab.body_to_string(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
