//! Evaluator - interpreting one tool result
//!
//! Evaluation runs a three-tier chain, cheapest first:
//! 1. [`heuristics`]: fixed thresholds over well-known result fields
//! 2. a bounded language-model call
//! 3. [`fallback`]: canned per-tool text
//!
//! Whatever tier answers, `needs_next_step` depends only on plan position.

pub mod fallback;
pub mod heuristics;

use netpulse_llm::util::{fill_template, truncate_safe};
use netpulse_llm::{extract_json_object, CompletionRequest, LlmProvider};
use netpulse_tools::ToolKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

pub use heuristics::Assessment;

/// Serialized tool results longer than this are cut before prompting
const MAX_RESULT_BYTES: usize = 4000;

/// Prompt for the model tier; `{problem}`, `{tool}` and `{result}` are substituted
pub const EVALUATION_PROMPT: &str = r#"You are a network diagnosis assistant.
The user's problem: "{problem}"
The diagnostic tool "{tool}" returned:
{result}

Interpret this result for a non-expert. Reply with a single JSON object and nothing else:
{"summary": "one sentence", "findings": ["..."], "recommendations": ["..."]}"#;

/// Configuration for the evaluator
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Hard bound on the model tier
    pub model_timeout: Duration,
    /// Sampling temperature for the model tier
    pub temperature: f32,
    /// Model override (provider default when `None`)
    pub model: Option<String>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(10),
            temperature: 0.2,
            model: None,
        }
    }
}

impl EvaluatorConfig {
    /// Set the model-tier timeout
    #[must_use]
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Which tier produced an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSource {
    /// Local thresholds
    Heuristic,
    /// Language model
    Model,
    /// Canned template
    Fallback,
}

/// Structured interpretation of one tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Tool id as evaluated (canonical when known)
    pub tool: String,
    /// One-line verdict
    pub summary: String,
    /// Observations
    pub findings: Vec<String>,
    /// Suggested actions
    pub recommendations: Vec<String>,
    /// Whether the plan has another step after this one
    pub needs_next_step: bool,
    /// Why the diagnosis continues or stops
    pub next_step_reason: String,
    /// Producing tier
    pub source: EvaluationSource,
}

/// Position and problem an evaluation is made in
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// User's problem text
    pub problem: &'a str,
    /// Zero-based index of the step that produced the result
    pub step_index: usize,
    /// Plan length
    pub total_steps: usize,
}

impl EvaluationContext<'_> {
    /// Whether another planned step follows
    #[must_use]
    pub fn needs_next_step(&self) -> bool {
        self.step_index + 1 < self.total_steps
    }

    fn next_step_reason(&self) -> String {
        if self.needs_next_step() {
            format!(
                "Continue with step {} of {} to complete the diagnosis",
                self.step_index + 2,
                self.total_steps
            )
        } else {
            "All planned checks are complete".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelEvaluation {
    summary: String,
    #[serde(default)]
    findings: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Three-tier result evaluator
pub struct Evaluator {
    provider: Arc<dyn LlmProvider>,
    config: EvaluatorConfig,
    cancel: CancellationToken,
}

impl Evaluator {
    /// Create a new evaluator
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: EvaluatorConfig) -> Self {
        Self {
            provider,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Cancel in-flight and future model-tier calls; evaluation keeps working via the other tiers
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Evaluate a raw tool result. Never fails.
    #[instrument(skip(self, raw, context), fields(tool = %tool_id, step = context.step_index))]
    pub async fn evaluate(
        &self,
        tool_id: &str,
        raw: &Value,
        context: &EvaluationContext<'_>,
    ) -> EvaluationResult {
        let kind = ToolKind::from_id(tool_id);
        let tool = kind.map_or_else(|| tool_id.trim().to_string(), |k| k.id().to_string());
        let payload = raw.get("data").unwrap_or(raw);

        if let Some(assessment) = kind.and_then(|k| heuristics::assess(k, payload)) {
            debug!("Heuristic evaluation");
            return Self::finish(tool, assessment, EvaluationSource::Heuristic, context);
        }

        if let Some(assessment) = self.ask_model(&tool, raw, context.problem).await {
            return Self::finish(tool, assessment, EvaluationSource::Model, context);
        }

        let assessment = fallback::template(kind);
        Self::finish(tool, assessment, EvaluationSource::Fallback, context)
    }

    /// Model tier: `None` on error, timeout, cancellation or unusable reply
    async fn ask_model(&self, tool: &str, raw: &Value, problem: &str) -> Option<Assessment> {
        let result = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
        let prompt = fill_template(
            EVALUATION_PROMPT,
            &[
                ("result", truncate_safe(&result, MAX_RESULT_BYTES)),
                ("tool", tool),
                ("problem", problem),
            ],
        );

        let request = CompletionRequest::prompt(prompt, self.config.temperature)
            .with_model(self.config.model.as_deref())
            .expecting_json();

        // Dropping the losing branch drops the provider future with it
        let cancel = self.cancel.child_token();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Model evaluation cancelled");
                return None;
            }
            outcome = tokio::time::timeout(self.config.model_timeout, self.provider.complete(request)) => outcome,
        };

        let reply = match outcome {
            Ok(Ok(response)) => response.text,
            Ok(Err(e)) => {
                warn!(error = %e, "Model evaluation failed, using fallback template");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.model_timeout.as_secs(),
                    "Model evaluation timed out, using fallback template"
                );
                return None;
            }
        };

        let parsed = extract_json_object(&reply)
            .and_then(|json| serde_json::from_str::<ModelEvaluation>(json).ok())
            .filter(|m| !m.summary.trim().is_empty());

        match parsed {
            Some(m) => Some(Assessment {
                summary: m.summary,
                findings: m.findings,
                recommendations: m.recommendations,
            }),
            None => {
                warn!("Model evaluation reply was not usable JSON, using fallback template");
                None
            }
        }
    }

    fn finish(
        tool: String,
        assessment: Assessment,
        source: EvaluationSource,
        context: &EvaluationContext<'_>,
    ) -> EvaluationResult {
        EvaluationResult {
            tool,
            summary: assessment.summary,
            findings: assessment.findings,
            recommendations: assessment.recommendations,
            needs_next_step: context.needs_next_step(),
            next_step_reason: context.next_step_reason(),
            source,
        }
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}
