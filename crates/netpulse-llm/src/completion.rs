//! Completion request and reply
//!
//! The diagnosis core only ever sends one prompt and reads back free text,
//! so a request is a prompt plus sampling knobs rather than a conversation.

use serde::{Deserialize, Serialize};

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens generated
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Prompt plus completion
    #[must_use]
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// One prompt for the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Prompt text
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Instruction sent ahead of the prompt, when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Model override; `None` uses the provider default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Generation cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Ask for a JSON-only reply where the backend can enforce it
    #[serde(default)]
    pub json_reply: bool,
}

impl CompletionRequest {
    /// `complete(prompt, temperature)`
    #[must_use]
    pub fn prompt(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            system: None,
            model: None,
            max_tokens: None,
            json_reply: false,
        }
    }

    /// Set the system instruction
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Override the model; `None` keeps the provider default
    #[must_use]
    pub fn with_model(mut self, model: Option<&str>) -> Self {
        self.model = model.map(str::to_string);
        self
    }

    /// Cap the generated tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request a JSON object as the reply
    #[must_use]
    pub fn expecting_json(mut self) -> Self {
        self.json_reply = true;
        self
    }

    /// The model to use given a provider default
    #[must_use]
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.model.as_deref() {
            Some(model) if !model.trim().is_empty() => model,
            _ => default,
        }
    }
}

/// Reply text and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Model that answered
    pub model: String,
    /// Token accounting, when reported
    pub usage: Option<TokenUsage>,
    /// Generation stopped at the token cap
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_override() {
        let request = CompletionRequest::prompt("why is dns slow", 0.2);
        assert_eq!(request.model_or("qwen2.5:7b"), "qwen2.5:7b");

        let request = request.with_model(Some("llama3.1"));
        assert_eq!(request.model_or("qwen2.5:7b"), "llama3.1");

        let request = request.with_model(Some("  "));
        assert_eq!(request.model_or("qwen2.5:7b"), "qwen2.5:7b");
    }

    #[test]
    fn test_builder() {
        let request = CompletionRequest::prompt("plan", 0.3)
            .with_system("Reply in JSON")
            .with_max_tokens(Some(512))
            .expecting_json();

        assert_eq!(request.system.as_deref(), Some("Reply in JSON"));
        assert_eq!(request.max_tokens, Some(512));
        assert!(request.json_reply);
        assert_eq!(TokenUsage { prompt_tokens: 10, completion_tokens: 5 }.total(), 15);
    }
}
