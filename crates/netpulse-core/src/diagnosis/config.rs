//! Diagnosis configuration

use crate::evaluator::EvaluatorConfig;
use crate::planner::PlannerConfig;
use std::time::Duration;

/// Configuration for the diagnostician
#[derive(Debug, Clone)]
pub struct DiagnosisConfig {
    /// Planner settings
    pub planner: PlannerConfig,
    /// Evaluator settings
    pub evaluator: EvaluatorConfig,
    /// Temperature for the final summary
    pub summary_temperature: f32,
    /// Upper bound on the final-summary call
    pub summary_timeout: Duration,
    /// Each tool result is cut to this many bytes in the summary prompt
    pub max_result_bytes: usize,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            evaluator: EvaluatorConfig::default(),
            summary_temperature: 0.5,
            summary_timeout: Duration::from_secs(60),
            max_result_bytes: 1500,
        }
    }
}

impl DiagnosisConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the planner configuration
    #[must_use]
    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    /// Set the evaluator configuration
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: EvaluatorConfig) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Set the final-summary timeout
    #[must_use]
    pub fn with_summary_timeout(mut self, timeout: Duration) -> Self {
        self.summary_timeout = timeout;
        self
    }
}
