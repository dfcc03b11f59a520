use crate::evaluator::EvaluationSource;
use serde::Serialize;
use uuid::Uuid;

/// Events emitted while a diagnosis runs.
///
/// Events carry identifiers and verdicts only; full tool output stays on the
/// session's executed-tool history.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosisEvent {
    /// A plan was produced for a submitted problem
    PlanReady {
        /// Diagnosis identifier
        diagnosis_id: Uuid,
        /// Planned tool ids in order
        tool_sequence: Vec<String>,
        /// Whether the built-in fallback plan was used
        is_fallback: bool,
    },
    /// A tool call was issued
    StepStarted {
        /// Diagnosis identifier
        diagnosis_id: Uuid,
        /// Zero-based step index
        step: usize,
        /// Canonical tool id
        tool: String,
    },
    /// A tool call returned a result
    StepCompleted {
        /// Diagnosis identifier
        diagnosis_id: Uuid,
        /// Zero-based step index
        step: usize,
        /// Canonical tool id
        tool: String,
        /// Call duration in milliseconds
        duration_ms: u64,
    },
    /// A tool call failed; the step can be retried
    StepFailed {
        /// Diagnosis identifier
        diagnosis_id: Uuid,
        /// Zero-based step index
        step: usize,
        /// Tool id as requested
        tool: String,
        /// Failure description
        error: String,
    },
    /// A step's evaluation settled
    EvaluationReady {
        /// Diagnosis identifier
        diagnosis_id: Uuid,
        /// Zero-based step index
        step: usize,
        /// Verdict
        summary: String,
        /// Producing tier
        source: EvaluationSource,
        /// Whether another step follows
        needs_next_step: bool,
    },
    /// The diagnosis reached its terminal state
    DiagnosisCompleted {
        /// Diagnosis identifier
        diagnosis_id: Uuid,
        /// Number of executed tools
        executed_steps: usize,
        /// Whether the final summary could not be generated
        is_error: bool,
    },
}

impl DiagnosisEvent {
    /// Get the diagnosis_id from any event variant.
    #[must_use]
    pub fn diagnosis_id(&self) -> Uuid {
        match self {
            Self::PlanReady { diagnosis_id, .. }
            | Self::StepStarted { diagnosis_id, .. }
            | Self::StepCompleted { diagnosis_id, .. }
            | Self::StepFailed { diagnosis_id, .. }
            | Self::EvaluationReady { diagnosis_id, .. }
            | Self::DiagnosisCompleted { diagnosis_id, .. } => *diagnosis_id,
        }
    }
}
