//! OpenAI - async-openai provider
//!
//! Works against api.openai.com or any OpenAI-compatible gateway through
//! `base_url`.

use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::util::{mask_api_key, truncate_safe};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};


/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI provider configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: String,
    /// Gateway root; `None` is api.openai.com
    pub base_url: Option<String>,
    /// Model used when a request names none
    pub default_model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    /// Configuration with the given key and defaults elsewhere
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Read `OPENAI_API_KEY`, plus `OPENAI_BASE_URL` and `OPENAI_MODEL` when set
    ///
    /// # Errors
    /// `NotConfigured` when `OPENAI_API_KEY` is missing or blank
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::NotConfigured("OPENAI_API_KEY not set".to_string()))?;

        let mut config = Self::new(api_key);
        config.base_url = std::env::var("OPENAI_BASE_URL").ok();
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.default_model = model;
        }
        Ok(config)
    }

    /// Set the gateway root
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI chat-completions provider
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    default_model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Create a provider
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        let mut api = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            api = api.with_api_base(base_url);
        }

        // async-openai's default client has no timeout
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        // Retrying is the diagnosis fallbacks' job; keep the built-in backoff short
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(config.timeout),
            ..Default::default()
        };

        Self {
            client: Client::build(http, api, backoff),
            default_model: config.default_model,
            timeout: config.timeout,
        }
    }

    fn build_request(&self, request: CompletionRequest) -> CreateChatCompletionRequest {
        let model = request.model_or(&self.default_model).to_string();

        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system),
                    name: None,
                }
                .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(request.prompt),
                name: None,
            }
            .into(),
        );

        CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            ..Default::default()
        }
    }
}

/// Map an async-openai failure onto the crate's taxonomy without echoing keys
pub(crate) fn classify_failure(error: &OpenAIError, timeout: Duration) -> Error {
    match error {
        OpenAIError::Reqwest(e) if e.is_timeout() => Error::Timeout(timeout.as_millis() as u64),
        OpenAIError::Reqwest(e) => Error::Unavailable(e.to_string()),
        other => classify_message(&other.to_string()),
    }
}

pub(crate) fn classify_message(message: &str) -> Error {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("quota") {
        return Error::RateLimited;
    }
    if ["api key", "apikey", "unauthorized", "authentication"]
        .iter()
        .any(|p| lower.contains(p))
    {
        return Error::Rejected {
            status: 401,
            message: "authentication failed; check OPENAI_API_KEY".to_string(),
        };
    }
    Error::Rejected {
        status: 0,
        message: truncate_safe(message, 300).to_string(),
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    #[instrument(skip(self, request), fields(model = request.model_or(&self.default_model)))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(request);
        debug!("Sending prompt to OpenAI");

        let response = self
            .client
            .chat()
            .create(body)
            .await
            .map_err(|e| classify_failure(&e, self.timeout))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmptyReply("no choices in reply".to_string()))?;
        let truncated = choice
            .finish_reason
            .as_ref()
            .is_some_and(|reason| format!("{:?}", reason).eq_ignore_ascii_case("length"));

        Ok(CompletionResponse {
            text: choice.message.content.unwrap_or_default(),
            model: response.model,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
            truncated,
        })
    }
}
