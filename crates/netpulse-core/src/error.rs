//! Error types for netpulse-core
//!
//! This module provides error types and user-friendly error formatting.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Planning failed before a plan (even the fallback) could be produced
    #[error("planning error: {0}")]
    Planning(String),

    /// A tool call failed or the collaborator reported failure
    #[error("tool execution failed for {tool}: {message}")]
    ToolExecution {
        /// Tool id
        tool: String,
        /// Failure description
        message: String,
    },

    /// The plan references a tool the catalog does not know
    #[error("plan integrity error: step {step} references unknown tool '{tool_id}'")]
    PlanIntegrity {
        /// Zero-based step index
        step: usize,
        /// Offending tool id
        tool_id: String,
    },

    /// Operation not allowed in the current diagnosis state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown capture session
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session monitoring failure
    #[error("monitor error: {0}")]
    Monitor(String),

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] netpulse_llm::Error),

    /// Tool collaborator error
    #[error("tool error: {0}")]
    Tool(#[from] netpulse_tools::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
///
/// Provides human-readable error messages and suggestions for fixing.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Planning(msg) => format!("📋 Could not plan the diagnosis: {}", msg),
            Error::ToolExecution { tool, message } => {
                format!("🔧 The {} test failed: {}", tool, message)
            }
            Error::PlanIntegrity { step, tool_id } => format!(
                "🧩 Step {} of the plan asks for '{}', which is not an available test.",
                step + 1,
                tool_id
            ),
            Error::InvalidState(msg) => format!("⏸️ {}", msg),
            Error::InvalidInput(msg) => format!("✏️ {}", msg),
            Error::SessionNotFound(id) => format!("🔎 No capture session named '{}'.", id),
            Error::Monitor(msg) => format!("📡 Capture monitoring stopped: {}", msg),
            Error::Llm(e) => format!("🤖 Language model error: {}", e),
            Error::Tool(e) if e.is_transient() => {
                format!("🌐 Could not reach the diagnostic service: {}", e)
            }
            Error::Tool(e) => format!("🔧 Tool error: {}", e),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::ToolExecution { .. } => {
                Some("💡 Check the parameters and run the step again.".to_string())
            }
            Error::PlanIntegrity { .. } => {
                Some("💡 Start a new diagnosis; `netpulse tools` lists the available tests.".to_string())
            }
            Error::InvalidInput(_) => {
                Some("💡 Describe the problem in a sentence, e.g. \"my wifi keeps dropping\".".to_string())
            }
            Error::Llm(_) => Some(
                "💡 Check the `llm` section of config/default.toml or the NETPULSE_LLM__* variables."
                    .to_string(),
            ),
            Error::Tool(e) if e.is_transient() => Some(
                "💡 Make sure the diagnostic service is running and `tools.base_url` points at it."
                    .to_string(),
            ),
            Error::Monitor(_) => {
                Some("💡 Restart monitoring with `netpulse monitor <session_id>`.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_integrity_message() {
        let error = Error::PlanIntegrity {
            step: 1,
            tool_id: "teleport".to_string(),
        };

        let msg = error.user_message();
        assert!(msg.contains("Step 2"));
        assert!(msg.contains("teleport"));
        assert!(error.suggestion().unwrap().contains("netpulse tools"));
    }

    #[test]
    fn test_transient_tool_error_message() {
        let error = Error::from(netpulse_tools::Error::Network("refused".to_string()));

        assert!(error.user_message().contains("diagnostic service"));
        assert!(error.suggestion().unwrap().contains("tools.base_url"));
    }

    #[test]
    fn test_fatal_tool_error_has_no_suggestion() {
        let error = Error::from(netpulse_tools::Error::InvalidResponse("bad json".to_string()));
        assert!(error.user_message().contains("Tool error"));
        assert!(error.suggestion().is_none());
    }

    #[test]
    fn test_format_error_for_cli() {
        let error = Error::ToolExecution {
            tool: "ping".to_string(),
            message: "host unreachable".to_string(),
        };

        let output = format_error_for_cli(&error);
        assert!(output.contains("ping"));
        assert!(output.contains("host unreachable"));
        assert!(output.contains("run the step again"));
    }
}
