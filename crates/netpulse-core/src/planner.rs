//! Planner - free-text complaint to diagnostic plan
//!
//! The planner asks the language model for an ordered list of catalog tools.
//! Planning never fails the user: any model error, timeout or malformed reply
//! yields [`DiagnosticPlan::fallback`]. Only an empty problem is rejected.

use crate::error::{Error, Result};
use netpulse_llm::util::{fill_template, truncate_safe};
use netpulse_llm::{extract_json_object, CompletionRequest, LlmProvider};
use netpulse_tools::{ToolCatalog, ToolKind, ToolTier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Prompt template; `{problem}` and `{tools}` are substituted
pub const PLAN_PROMPT: &str = r#"You are a network diagnosis assistant helping a non-expert user.

User's problem:
"{problem}"

Available diagnostic tools, grouped from basic to advanced:
{tools}

Design a short diagnostic plan:
- Start with basic tools and move to advanced ones only when they add information.
- Prefer 2 to 4 steps.
- Use only tool ids from the list above.

Reply with a single JSON object and nothing else:
{
  "analysis": "one or two sentences on what is likely wrong",
  "reasoning": "why this sequence of tools",
  "urgency": "high | medium | low",
  "totalSteps": 2,
  "diagnosticPlan": ["tool_id", "tool_id"],
  "stepReasons": ["why step 1", "why step 2"]
}"#;

/// Configuration for the planner
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Model override (provider default when `None`)
    pub default_model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens for the reply
    pub max_tokens: Option<u32>,
    /// Problem text is cut to this many characters before prompting
    pub max_problem_chars: usize,
    /// Upper bound on the model call
    pub timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            temperature: 0.3,
            max_tokens: Some(1024),
            max_problem_chars: 2000,
            timeout: Duration::from_secs(30),
        }
    }
}

impl PlannerConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    /// Set the problem length cap
    #[must_use]
    pub fn with_max_problem_chars(mut self, max: usize) -> Self {
        self.max_problem_chars = max;
        self
    }

    /// Set the model-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Urgency classification of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Service is down
    High,
    /// Degraded
    #[default]
    Medium,
    /// Cosmetic or intermittent
    Low,
}

impl Urgency {
    /// Lenient parse; anything unrecognized is `Medium`
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" | "critical" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered diagnostic plan
///
/// `tool_sequence`, `step_reasons` and `total_steps` always agree in length,
/// and a plan always has at least one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticPlan {
    /// What is likely wrong
    pub analysis: String,
    /// Why this sequence
    pub reasoning: String,
    /// Urgency
    pub urgency: Urgency,
    total_steps: usize,
    tool_sequence: Vec<String>,
    step_reasons: Vec<String>,
    /// Whether this is the built-in fallback plan
    #[serde(default)]
    pub is_fallback: bool,
}

impl DiagnosticPlan {
    /// Build a plan, clamping reasons to the tool sequence.
    ///
    /// Missing reasons are filled with a generic one, extra reasons dropped.
    /// Known tool ids are canonicalized; unknown ids are kept verbatim so the
    /// executor can report them. An empty sequence yields the fallback plan.
    #[must_use]
    pub fn new(
        analysis: impl Into<String>,
        reasoning: impl Into<String>,
        urgency: Urgency,
        tool_sequence: Vec<String>,
        mut step_reasons: Vec<String>,
    ) -> Self {
        let tool_sequence: Vec<String> = tool_sequence
            .into_iter()
            .map(|id| match ToolKind::from_id(&id) {
                Some(kind) => kind.id().to_string(),
                None => id.trim().to_string(),
            })
            .filter(|id| !id.is_empty())
            .collect();

        if tool_sequence.is_empty() {
            return Self::fallback();
        }

        step_reasons.truncate(tool_sequence.len());
        while step_reasons.len() < tool_sequence.len() {
            let step = step_reasons.len();
            step_reasons.push(format!("Run {} to narrow down the problem", tool_sequence[step]));
        }

        Self {
            analysis: analysis.into(),
            reasoning: reasoning.into(),
            urgency,
            total_steps: tool_sequence.len(),
            tool_sequence,
            step_reasons,
            is_fallback: false,
        }
    }

    /// The fixed plan used whenever the model cannot produce one
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            analysis: "Automatic analysis is unavailable; running the standard connectivity checks."
                .to_string(),
            reasoning: "Ping and a connectivity check cover the most common causes of network trouble."
                .to_string(),
            urgency: Urgency::Medium,
            total_steps: 2,
            tool_sequence: vec![
                ToolKind::Ping.id().to_string(),
                ToolKind::ConnectivityCheck.id().to_string(),
            ],
            step_reasons: vec![
                "Check basic reachability and latency".to_string(),
                "Check whether common sites are reachable".to_string(),
            ],
            is_fallback: true,
        }
    }

    /// Number of steps
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Tool ids in execution order
    #[must_use]
    pub fn tool_sequence(&self) -> &[String] {
        &self.tool_sequence
    }

    /// Per-step rationale, index-aligned with the tool sequence
    #[must_use]
    pub fn step_reasons(&self) -> &[String] {
        &self.step_reasons
    }

    /// Tool id and reason of one step
    #[must_use]
    pub fn step(&self, index: usize) -> Option<(&str, &str)> {
        let tool = self.tool_sequence.get(index)?;
        let reason = self.step_reasons.get(index).map_or("", String::as_str);
        Some((tool.as_str(), reason))
    }
}

/// Raw model reply; every field is optional so partial replies still parse
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlan {
    analysis: Option<String>,
    reasoning: Option<String>,
    urgency: Option<String>,
    #[serde(alias = "diagnostic_plan", alias = "toolSequence", alias = "tool_sequence")]
    #[serde(rename = "diagnosticPlan")]
    diagnostic_plan: Vec<Value>,
    #[serde(rename = "stepReasons", alias = "step_reasons")]
    step_reasons: Vec<Value>,
}

/// Plan builder backed by a language model
pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    catalog: Arc<ToolCatalog>,
    config: PlannerConfig,
}

impl Planner {
    /// Create a new planner
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        catalog: Arc<ToolCatalog>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            provider,
            catalog,
            config,
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Build a plan for a problem description.
    ///
    /// Returns `Err` only for an empty problem.
    #[instrument(skip(self, problem), fields(provider = %self.provider.name()))]
    pub async fn build_plan(&self, problem: &str) -> Result<DiagnosticPlan> {
        let problem = problem.trim();
        if problem.is_empty() {
            return Err(Error::InvalidInput(
                "the problem description is empty".to_string(),
            ));
        }

        let prompt = self.build_prompt(problem);
        let request = CompletionRequest::prompt(prompt, self.config.temperature)
            .with_model(self.config.default_model.as_deref())
            .with_max_tokens(self.config.max_tokens)
            .expecting_json();

        let reply = match tokio::time::timeout(self.config.timeout, self.provider.complete(request))
            .await
        {
            Ok(Ok(response)) => response.text,
            Ok(Err(e)) => {
                warn!(error = %e, "Plan model call failed, using fallback plan");
                return Ok(DiagnosticPlan::fallback());
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.timeout.as_secs(),
                    "Plan model call timed out, using fallback plan"
                );
                return Ok(DiagnosticPlan::fallback());
            }
        };

        match Self::parse_plan(&reply) {
            Some(plan) => {
                info!(
                    steps = plan.total_steps(),
                    urgency = %plan.urgency,
                    "Diagnostic plan ready"
                );
                Ok(plan)
            }
            None => {
                warn!("Plan reply was not a usable JSON plan, using fallback plan");
                debug!(reply = %truncate_safe(&reply, 500), "Unparseable plan reply");
                Ok(DiagnosticPlan::fallback())
            }
        }
    }

    /// Render the planning prompt
    #[must_use]
    pub fn build_prompt(&self, problem: &str) -> String {
        let problem = truncate_chars(problem, self.config.max_problem_chars);

        let mut tools = String::new();
        for tier in ToolTier::ALL {
            let defs = self.catalog.by_tier(tier);
            if defs.is_empty() {
                continue;
            }
            tools.push_str(tier.label());
            tools.push_str(":\n");
            for def in defs {
                tools.push_str(&def.prompt_line());
                tools.push('\n');
            }
        }

        fill_template(
            PLAN_PROMPT,
            &[("tools", tools.trim_end()), ("problem", problem)],
        )
    }

    /// Parse a model reply into a plan; `None` when no usable plan is present
    #[must_use]
    pub fn parse_plan(reply: &str) -> Option<DiagnosticPlan> {
        let json = extract_json_object(reply)?;
        let raw: RawPlan = serde_json::from_str(json).ok()?;

        let sequence: Vec<String> = raw
            .diagnostic_plan
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if sequence.is_empty() {
            return None;
        }

        let reasons = raw
            .step_reasons
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        Some(DiagnosticPlan::new(
            raw.analysis.unwrap_or_default(),
            raw.reasoning.unwrap_or_default(),
            raw.urgency
                .as_deref()
                .map(Urgency::parse_lenient)
                .unwrap_or_default(),
            sequence,
            reasons,
        ))
    }
}

/// Cut a string to at most `max_chars` characters
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests;
