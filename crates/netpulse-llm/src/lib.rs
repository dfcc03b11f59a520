//! NetPulse LLM - Language Model Collaborator
//!
//! The diagnosis core talks to a language model in three places (planning,
//! evaluation, final summary), always as `complete(prompt, temperature) -> text`.
//! This crate provides:
//! - Provider: the `LlmProvider` trait
//! - Ollama: local Ollama provider (`/api/generate`)
//! - OpenAI: OpenAI-compatible provider (async-openai)
//! - Mock: scriptable provider for tests and offline runs
//! - Util: JSON extraction from free-form model output

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod mock;
pub mod provider;
pub mod providers;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use providers::ollama::{OllamaConfig, OllamaProvider};
pub use providers::openai::{OpenAiConfig, OpenAiProvider};
pub use util::extract_json_object;
