//! NetPulse Core - Diagnosis Orchestration Engine
//!
//! This crate provides the orchestration logic for NetPulse:
//! - Planning: turning a free-text complaint into a diagnostic plan
//! - Diagnosis: the stepwise executor that walks a plan one tool at a time
//! - Evaluation: interpreting tool results (heuristics, model, static fallback)
//! - Monitoring: polling long-running capture sessions to completion
//! - Events: broadcast of diagnosis lifecycle events

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod diagnosis;
pub mod error;
pub mod evaluator;
pub mod event_bus;
pub mod monitor;
pub mod planner;

pub use diagnosis::{
    DiagnosisConfig, DiagnosisSession, DiagnosisState, Diagnostician, DiagnosticContext,
    ExecutedToolRecord, FinalReport, NextStep, StepOutcome, ToolRecommendation,
};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use evaluator::{
    EvaluationContext, EvaluationResult, EvaluationSource, Evaluator, EvaluatorConfig,
};
pub use event_bus::{DiagnosisEvent, DiagnosisFeed, EventBus};
pub use monitor::{
    CaptureSession, MonitorConfig, MonitorEvent, SessionDefaults, SessionMonitor, SessionStatus,
};
pub use planner::{DiagnosticPlan, Planner, PlannerConfig, Urgency};

// Re-export the collaborator crates
pub use netpulse_llm;
pub use netpulse_tools;
