use crate::config::Config;
use crate::error::ExchangeError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    #[serde(rename = "sessionId")]
    pub session_id: Option<&'a str>,
}

/// Successful reply from `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(rename = "sessionId", alias = "session_id", default)]
    pub session_id: Option<String>,
    /// Normalised form of the user's message, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_input: Option<String>,
}

impl ChatReply {
    pub fn new(response: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            session_id: Some(session_id.into()),
            processed_input: None,
        }
    }
}

/// Failure body sent alongside a non-success status
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Reply from `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Carries one message to the chat service and brings back the reply
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Perform one exchange. Called once per submission, never retried.
    async fn send(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply, ExchangeError>;

    /// Signal that the conversation owning `session_id` was discarded.
    /// Fire-and-forget: the caller neither waits nor learns the outcome.
    fn release_session(&self, _session_id: &str) {}
}

/// HTTP implementation of [`ChatTransport`]
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: crate::config::normalize_base_url(&config.api_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the service health endpoint
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Health check failed with status {}", response.status());
        }

        response
            .json::<HealthStatus>()
            .await
            .context("Failed to parse health response")
    }

    /// Pull a usable detail message out of an error body
    fn extract_detail(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail? {
            serde_json::Value::String(detail) => Some(detail),
            _ => None,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply, ExchangeError> {
        let url = format!("{}/chat", self.base_url);
        let payload = ChatRequest { message, session_id };

        let response = self.client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%url, error = %e, "Chat request failed");
                ExchangeError::generic()
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = Self::extract_detail(&body);
            tracing::warn!(%status, detail = ?detail, "Chat service returned an error");
            return Err(ExchangeError::from_detail(detail));
        }

        let reply = response.json::<ChatReply>().await.map_err(|e| {
            tracing::warn!(error = %e, "Malformed chat response");
            ExchangeError::generic()
        })?;

        if let Some(processed) = &reply.processed_input {
            tracing::debug!(processed_input = %processed, "Server processed input");
        }

        Ok(reply)
    }

    fn release_session(&self, session_id: &str) {
        // The service expires sessions itself; there is no endpoint to call.
        tracing::debug!(session_id, "Session released");
    }
}
