//! Concrete language-model providers

pub mod ollama;
pub mod openai;
