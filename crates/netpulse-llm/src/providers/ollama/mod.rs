//! Ollama - local model provider
//!
//! Local inference keeps the diagnosis usable on machines with no cloud
//! access, which is the common case when the network itself is broken.

mod wire;

#[cfg(test)]
mod tests;

use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::util::truncate_safe;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use wire::{ErrorBody, GenerateRequest, GenerateResponse, SamplingOptions};

/// Default Ollama model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";

/// Default Ollama endpoint
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server root
    pub base_url: String,
    /// Model used when a request names none
    pub default_model: String,
    /// Generation cap used when a request sets none
    pub default_max_tokens: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_max_tokens: 1024,
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server root
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the default generation cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Ollama provider
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a provider
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::NotConfigured(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Whether the server answers at all
    pub async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.config.base_url))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> GenerateRequest<'a> {
        GenerateRequest {
            model: request.model_or(&self.config.default_model),
            prompt: &request.prompt,
            system: request.system.as_deref(),
            format: request.json_reply.then_some("json"),
            stream: false,
            options: SamplingOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens.unwrap_or(self.config.default_max_tokens),
            },
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.config.timeout.as_millis() as u64)
        } else if error.is_connect() {
            Error::Unavailable(format!("no Ollama server at {}", self.config.base_url))
        } else {
            Error::Unavailable(error.to_string())
        }
    }
}

/// Turn an Ollama error body into a short message without local paths
pub(crate) fn describe_failure(raw: &str) -> String {
    let message = serde_json::from_str::<ErrorBody>(raw)
        .map(|body| body.error)
        .unwrap_or_else(|_| raw.to_string());
    let lower = message.to_lowercase();

    if lower.contains("model") && (lower.contains("not found") || lower.contains("pull")) {
        return "model not installed; run `ollama pull <model>`".to_string();
    }
    if ["/home", "/root", "/var", "/users/", "\\users\\"]
        .iter()
        .any(|p| lower.contains(p))
    {
        return "Ollama reported an internal error".to_string();
    }
    truncate_safe(message.trim(), 300).to_string()
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = request.model_or(&self.config.default_model)))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_body(&request);
        debug!(json = request.json_reply, "Sending prompt to Ollama");

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let raw = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(Error::from_status(status.as_u16(), describe_failure(&raw)));
        }

        let reply: GenerateResponse = serde_json::from_str(&raw)
            .map_err(|e| Error::EmptyReply(format!("malformed Ollama reply: {}", e)))?;

        Ok(CompletionResponse {
            text: reply.response,
            model: reply.model,
            usage: match (reply.prompt_eval_count, reply.eval_count) {
                (Some(prompt_tokens), Some(completion_tokens)) => Some(TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                }),
                _ => None,
            },
            truncated: reply.done_reason.as_deref() == Some("length"),
        })
    }
}
