//! LLM provider resolution

use super::config::LlmConfig;
use anyhow::{bail, Context, Result};
use netpulse_llm::{LlmProvider, OllamaConfig, OllamaProvider, OpenAiConfig, OpenAiProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the configured language-model provider
pub fn resolve_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.provider.trim().to_ascii_lowercase().as_str() {
        "ollama" => {
            let mut ollama = OllamaConfig::new().with_timeout(timeout);
            if let Some(url) = config.base_url() {
                ollama = ollama.with_base_url(url);
            }
            if let Some(model) = config.model() {
                ollama = ollama.with_model(model);
            }
            let provider =
                OllamaProvider::new(ollama).context("Failed to initialize Ollama provider")?;
            info!(model = provider.default_model(), "Using Ollama provider");
            Ok(Arc::new(provider))
        }
        "openai" => {
            let mut openai = OpenAiConfig::from_env()
                .context("OpenAI provider selected but OPENAI_API_KEY is not set")?
                .with_timeout(timeout);
            if let Some(url) = config.base_url() {
                openai = openai.with_base_url(url);
            }
            if let Some(model) = config.model() {
                openai = openai.with_model(model);
            }
            let provider = OpenAiProvider::new(openai);
            info!(model = provider.default_model(), "Using OpenAI provider");
            Ok(Arc::new(provider))
        }
        other => bail!("Unknown LLM provider '{}' (expected 'ollama' or 'openai')", other),
    }
}
