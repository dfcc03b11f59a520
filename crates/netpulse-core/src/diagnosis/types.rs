//! Diagnosis types
//!
//! - `DiagnosisState` and `DiagnosisSession`: the per-diagnosis state machine record
//! - `DiagnosticContext` and `ExecutedToolRecord`: progress and audit trail
//! - `ToolRecommendation`, `NextStep`, `StepOutcome`, `FinalReport`: values handed to callers

use crate::evaluator::EvaluationResult;
use crate::planner::DiagnosticPlan;
use chrono::{DateTime, Utc};
use netpulse_tools::{ParameterSpec, ToolCategory, ToolDefinition, ToolPriority};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Executor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisState {
    /// No problem submitted yet
    Idle,
    /// Plan being built
    Planning,
    /// Waiting for the next step to be requested or executed
    AwaitingStep,
    /// Tool call in flight
    Executing,
    /// Evaluation in flight
    Evaluating,
    /// Terminal
    Completed,
}

impl DiagnosisState {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::AwaitingStep => "awaiting_step",
            Self::Executing => "executing",
            Self::Evaluating => "evaluating",
            Self::Completed => "completed",
        }
    }
}

/// One executed tool; immutable once appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedToolRecord {
    /// Canonical tool id
    pub id: String,
    /// Display name
    pub name: String,
    /// Raw collaborator response
    pub result: Value,
    /// When the result arrived
    pub timestamp: DateTime<Utc>,
    /// Call duration in milliseconds
    pub duration_ms: u64,
    /// Background session started by the tool, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_session: Option<String>,
}

/// Progress of one diagnosis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticContext {
    original_problem: String,
    current_step: usize,
    total_steps: usize,
    executed_tools: Vec<ExecutedToolRecord>,
    is_complete: bool,
}

impl DiagnosticContext {
    pub(crate) fn start(problem: &str, total_steps: usize) -> Self {
        Self {
            original_problem: problem.to_string(),
            total_steps,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, record: ExecutedToolRecord) {
        self.executed_tools.push(record);
        self.current_step += 1;
    }

    pub(crate) fn mark_complete(&mut self) {
        self.is_complete = true;
    }

    /// User's problem text
    #[must_use]
    pub fn original_problem(&self) -> &str {
        &self.original_problem
    }

    /// Zero-based cursor; equals the number of executed tools
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Plan length
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Audit trail
    #[must_use]
    pub fn executed_tools(&self) -> &[ExecutedToolRecord] {
        &self.executed_tools
    }

    /// Terminal flag
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }
}

/// UI-ready view of one plan step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecommendation {
    /// Canonical tool id
    pub id: String,
    /// Display name
    pub name: String,
    /// What the tool checks
    pub description: String,
    /// Category
    pub category: ToolCategory,
    /// Priority
    pub priority: ToolPriority,
    /// Rough duration in seconds
    pub estimated_duration_secs: u32,
    /// Parameter schema
    pub parameters: Vec<ParameterSpec>,
    /// Collaborator endpoint
    pub endpoint: String,
    /// Why this step is in the plan
    pub reasoning: String,
    /// Zero-based step index
    pub step: usize,
    /// Plan length
    pub total_steps: usize,
}

impl ToolRecommendation {
    pub(crate) fn from_definition(
        definition: &ToolDefinition,
        reasoning: &str,
        step: usize,
        total_steps: usize,
    ) -> Self {
        Self {
            id: definition.kind.id().to_string(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            category: definition.category,
            priority: definition.priority,
            estimated_duration_secs: definition.estimated_duration_secs,
            parameters: definition.parameters.clone(),
            endpoint: definition.endpoint.clone(),
            reasoning: reasoning.to_string(),
            step,
            total_steps,
        }
    }

    /// Object of every declared default
    #[must_use]
    pub fn default_params(&self) -> Value {
        let map: Map<String, Value> = self
            .parameters
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
        Value::Object(map)
    }
}

/// Closing report of a diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Free-text report
    pub text: String,
    /// Whether the summary could not be generated
    pub is_error: bool,
    /// Number of executed tools
    pub executed_steps: usize,
}

/// Answer to "what runs next"
#[derive(Debug, Clone)]
pub enum NextStep {
    /// Run this tool
    Tool(ToolRecommendation),
    /// Diagnosis finished
    Completed(FinalReport),
}

/// Result of one executed step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Zero-based index of the executed step
    pub step: usize,
    /// Appended record
    pub record: ExecutedToolRecord,
    /// Evaluation of the result
    pub evaluation: EvaluationResult,
    /// Background capture session started by the tool
    pub capture_session: Option<String>,
    /// Whether `capture_session` was handed to the session monitor by this step
    pub capture_monitored: bool,
    /// Set when this was the last planned step
    pub final_report: Option<FinalReport>,
}

/// One diagnosis: state, context, plan and latest evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    pub(crate) state: DiagnosisState,
    pub(crate) context: DiagnosticContext,
    pub(crate) plan: Option<DiagnosticPlan>,
    pub(crate) last_evaluation: Option<EvaluationResult>,
    pub(crate) final_report: Option<FinalReport>,
}

impl Default for DiagnosisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosisSession {
    /// A fresh session in `Idle`
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state: DiagnosisState::Idle,
            context: DiagnosticContext::default(),
            plan: None,
            last_evaluation: None,
            final_report: None,
        }
    }

    /// Diagnosis identifier
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation time
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> DiagnosisState {
        self.state
    }

    /// Progress record
    #[must_use]
    pub fn context(&self) -> &DiagnosticContext {
        &self.context
    }

    /// Plan, once built
    #[must_use]
    pub fn plan(&self) -> Option<&DiagnosticPlan> {
        self.plan.as_ref()
    }

    /// Evaluation of the most recent step
    #[must_use]
    pub fn evaluation(&self) -> Option<&EvaluationResult> {
        self.last_evaluation.as_ref()
    }

    /// Final report, once complete
    #[must_use]
    pub fn final_report(&self) -> Option<&FinalReport> {
        self.final_report.as_ref()
    }

    /// Whether the diagnosis reached its terminal state
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == DiagnosisState::Completed
    }

    /// Capture sessions started by executed tools, in order
    #[must_use]
    pub fn capture_sessions(&self) -> Vec<&str> {
        self.context
            .executed_tools()
            .iter()
            .filter_map(|r| r.capture_session.as_deref())
            .collect()
    }

    /// Steps the executor will actually walk: the lesser of the declared
    /// count and the tool sequence length
    #[must_use]
    pub fn effective_total_steps(&self) -> usize {
        let declared = self.context.total_steps();
        self.plan
            .as_ref()
            .map_or(0, |plan| declared.min(plan.tool_sequence().len()))
    }
}
