//! Transport - invoking collaborator endpoints
//!
//! The runner never talks HTTP directly; it hands an endpoint path and a
//! parameter object to a [`ToolTransport`]. [`HttpTransport`] is the
//! production implementation, tests substitute scripted transports.

use crate::error::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Maximum response body length kept in error messages
const MAX_ERROR_BODY: usize = 300;

/// Something that can invoke a tool's collaborator endpoint
#[async_trait::async_trait]
pub trait ToolTransport: Send + Sync {
    /// POST `params` to `endpoint` and return the decoded JSON body
    async fn invoke(&self, endpoint: &str, params: &Value) -> Result<Value>;
}

/// HTTP transport against the collaborator service
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The collaborator service root
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl ToolTransport for HttpTransport {
    #[instrument(skip(self, params), fields(endpoint = %endpoint))]
    async fn invoke(&self, endpoint: &str, params: &Value) -> Result<Value> {
        let url = join(&self.base_url, endpoint)?;
        debug!(url = %url, "Invoking tool endpoint");

        let response = self
            .client
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        read_json(response, self.timeout).await
    }
}

/// Parse and normalize a service root so relative joins keep its path
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| Error::InvalidInput(format!("invalid base url '{}': {}", raw, e)))
}

/// Join an absolute endpoint path (`/api/...`) onto the service root
pub(crate) fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| Error::InvalidInput(format!("invalid endpoint '{}': {}", path, e)))
}

pub(crate) fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout(timeout.as_millis() as u64)
    } else if e.is_connect() || e.is_request() {
        Error::Network(e.to_string())
    } else if e.is_decode() {
        Error::InvalidResponse(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

/// Check the status and decode a JSON body
pub(crate) async fn read_json(response: reqwest::Response, timeout: Duration) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            message: truncate(&body, MAX_ERROR_BODY),
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keeps_base_path() {
        let base = parse_base_url("http://localhost:8000/netpulse").unwrap();
        let url = join(&base, "/api/tools/ping").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/netpulse/api/tools/ping");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = parse_base_url("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
