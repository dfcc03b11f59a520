//! Scriptable provider for tests and offline runs
//!
//! Queued replies are served first, in order; once the queue is drained the
//! standing reply answers every call. Clones share one script, so a test can
//! keep a handle while a component owns another.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const MOCK_MODEL: &str = "mock-model";

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Unavailable(String),
}

impl Scripted {
    fn into_result(self) -> Result<CompletionResponse> {
        match self {
            Self::Text(text) => Ok(CompletionResponse {
                text,
                model: MOCK_MODEL.to_string(),
                usage: None,
                truncated: false,
            }),
            Self::Unavailable(reason) => Err(Error::Unavailable(reason)),
        }
    }
}

#[derive(Debug)]
struct Script {
    queued: VecDeque<Scripted>,
    standing: Scripted,
    seen: Vec<CompletionRequest>,
}

/// A provider that answers from a script
#[derive(Debug, Clone)]
pub struct MockProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// A provider answering "mock response" until scripted otherwise
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                queued: VecDeque::new(),
                standing: Scripted::Text("mock response".to_string()),
                seen: Vec::new(),
            })),
            delay: None,
        }
    }

    /// A provider whose every call fails as if the backend were down
    #[must_use]
    pub fn unavailable() -> Self {
        let provider = Self::new();
        provider.set_default_failure("model backend unavailable");
        provider
    }

    /// Wait this long before answering each call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a text reply
    pub fn push_text(&self, text: impl Into<String>) {
        self.lock().queued.push_back(Scripted::Text(text.into()));
    }

    /// Queue a failure
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.lock()
            .queued
            .push_back(Scripted::Unavailable(reason.into()));
    }

    /// Answer unqueued calls with this text
    pub fn set_default_text(&self, text: impl Into<String>) {
        self.lock().standing = Scripted::Text(text.into());
    }

    /// Fail every unqueued call
    pub fn set_default_failure(&self, reason: impl Into<String>) {
        self.lock().standing = Scripted::Unavailable(reason.into());
    }

    /// Calls received so far, including ones still waiting out the delay
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Requests received so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock().seen.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        MOCK_MODEL
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let reply = {
            let mut script = self.lock();
            script.seen.push(request);
            match script.queued.pop_front() {
                Some(reply) => reply,
                None => script.standing.clone(),
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        reply.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_standing_reply() {
        let provider = MockProvider::new();
        provider.push_text("first");
        provider.push_failure("boom");

        let first = provider.complete(CompletionRequest::prompt("a", 0.0)).await;
        assert_eq!(first.unwrap().text, "first");

        let second = provider.complete(CompletionRequest::prompt("b", 0.0)).await;
        assert!(matches!(second, Err(Error::Unavailable(_))));

        let third = provider.complete(CompletionRequest::prompt("c", 0.0)).await;
        assert_eq!(third.unwrap().text, "mock response");

        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.requests()[1].prompt, "b");
    }

    #[tokio::test]
    async fn test_clones_share_the_script() {
        let provider = MockProvider::unavailable();
        let handle = provider.clone();
        handle.push_text("   ");

        let blank = provider.complete_text("x", 0.3).await;
        assert!(matches!(blank, Err(Error::EmptyReply(_))));
        assert!(provider.complete_text("y", 0.3).await.is_err());
        assert_eq!(handle.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_is_counted_before_the_delay() {
        let provider = MockProvider::new().with_delay(Duration::from_secs(30));
        let pending = tokio::spawn({
            let provider = provider.clone();
            async move { provider.complete(CompletionRequest::prompt("slow", 0.0)).await }
        });

        tokio::task::yield_now().await;
        assert_eq!(provider.call_count(), 1);
        assert!(pending.await.unwrap().is_ok());
    }
}
