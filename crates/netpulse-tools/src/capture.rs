//! Capture - background packet-capture collaborator
//!
//! A packet capture started through the runner returns a session id right
//! away; progress is then read through the status / stop / analyze endpoints
//! exposed here. The Session Monitor in `netpulse-core` polls through the
//! [`CaptureBackend`] trait.

use crate::error::{Error, Result};
use crate::transport::{join, map_reqwest_error, parse_base_url, read_json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Live status of a capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureStatus {
    /// Session id
    #[serde(alias = "sessionId")]
    pub session_id: String,
    /// Whether packets are still being captured
    #[serde(default)]
    pub is_capturing: bool,
    /// Packets captured so far
    #[serde(default)]
    pub current_packet_count: u64,
    /// Seconds since start
    #[serde(default)]
    pub elapsed_time: f64,
    /// Seconds left, when the collaborator knows
    #[serde(default)]
    pub remaining_time: Option<f64>,
    /// Collaborator's own status string
    #[serde(default)]
    pub status: String,
}

impl CaptureStatus {
    /// Whether the capture has finished on the collaborator side
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed") || !self.is_capturing
    }
}

/// Reply to a stop request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopResponse {
    /// Whether the capture was stopped
    #[serde(default)]
    pub success: bool,
    /// Failure reason
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply to an analysis request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Whether analysis succeeded
    #[serde(default)]
    pub success: bool,
    /// Analysis payload
    #[serde(default)]
    pub data: Value,
    /// Failure reason
    #[serde(default)]
    pub error: Option<String>,
}

/// Capture collaborator
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Current status of a session
    async fn status(&self, session_id: &str) -> Result<CaptureStatus>;

    /// Ask the collaborator to stop a session
    async fn stop(&self, session_id: &str) -> Result<StopResponse>;

    /// Run the follow-up analysis of a finished session
    async fn analyze(&self, session_id: &str) -> Result<AnalysisResponse>;
}

/// HTTP capture collaborator
#[derive(Debug, Clone)]
pub struct HttpCaptureBackend {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpCaptureBackend {
    /// Create a backend rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            timeout,
        })
    }

    fn session_url(&self, session_id: &str, action: &str) -> Result<Url> {
        if session_id.trim().is_empty() {
            return Err(Error::InvalidInput("empty capture session id".to_string()));
        }
        join(
            &self.base_url,
            &format!(
                "/api/capture/{}/{}",
                urlencoding::encode(session_id),
                action
            ),
        )
    }
}

#[async_trait::async_trait]
impl CaptureBackend for HttpCaptureBackend {
    #[instrument(skip(self))]
    async fn status(&self, session_id: &str) -> Result<CaptureStatus> {
        let url = self.session_url(session_id, "status")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let body = read_json(response, self.timeout).await?;
        // Some deployments wrap the status in {success, data}
        let payload = body.get("data").cloned().unwrap_or(body);
        let status: CaptureStatus = serde_json::from_value(payload)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        debug!(
            packets = status.current_packet_count,
            capturing = status.is_capturing,
            "Capture status"
        );
        Ok(status)
    }

    #[instrument(skip(self))]
    async fn stop(&self, session_id: &str) -> Result<StopResponse> {
        let url = self.session_url(session_id, "stop")?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let body = read_json(response, self.timeout).await?;
        serde_json::from_value(body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn analyze(&self, session_id: &str) -> Result<AnalysisResponse> {
        let url = self.session_url(session_id, "analyze")?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let body = read_json(response, self.timeout).await?;
        serde_json::from_value(body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}
