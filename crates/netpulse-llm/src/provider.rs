//! Language-model collaborator trait

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};

/// A language-model backend.
///
/// Output is free text with no guarantee of valid JSON, even when
/// `json_reply` was requested; callers parse it defensively.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Model used when a request names none
    fn default_model(&self) -> &str;

    /// Send one prompt
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Send one prompt and return only the text; blank replies are errors
    async fn complete_text(&self, prompt: &str, temperature: f32) -> Result<String> {
        let response = self
            .complete(CompletionRequest::prompt(prompt, temperature))
            .await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(Error::EmptyReply(format!("{} returned no text", self.name())));
        }
        Ok(text.to_string())
    }
}
