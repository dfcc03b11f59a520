//! Diagnosis - the stepwise executor
//!
//! A diagnosis walks one [`DiagnosticPlan`](crate::planner::DiagnosticPlan)
//! a tool at a time:
//!
//! ```text
//! Idle -> Planning -> AwaitingStep <-> Executing -> Evaluating -> AwaitingStep ... -> Completed
//! ```
//!
//! All state lives on an explicit [`DiagnosisSession`]; the [`Diagnostician`]
//! holds only collaborators, so one diagnostician can drive many sessions.
//!
//! # Module Structure
//!
//! - `types`: session, context and the values handed to callers
//! - `config`: `DiagnosisConfig`
//! - `core`: `Diagnostician` struct and builder methods
//! - `process`: state transitions (submit, next step, execute, auto-run)
//! - `summary`: final-summary generation

mod config;
mod core;
mod process;
mod summary;
mod types;

#[cfg(test)]
mod tests;

pub use config::DiagnosisConfig;
pub use core::Diagnostician;
pub use types::{
    DiagnosisSession, DiagnosisState, DiagnosticContext, ExecutedToolRecord, FinalReport,
    NextStep, StepOutcome, ToolRecommendation,
};
