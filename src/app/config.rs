//! Application configuration types
//!
//! Plain serde structs mirroring `config/default.toml`; each section converts
//! into the matching library config.

use netpulse_core::{
    DiagnosisConfig, EvaluatorConfig, MonitorConfig, PlannerConfig, SessionDefaults,
};
use netpulse_tools::RunnerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub planner: PlannerAppConfig,
    #[serde(default)]
    pub evaluator: EvaluatorAppConfig,
    #[serde(default)]
    pub diagnosis: DiagnosisAppConfig,
    #[serde(default)]
    pub monitor: MonitorAppConfig,
}

impl AppConfig {
    /// Executor configuration assembled from the planner, evaluator and
    /// diagnosis sections
    pub fn diagnosis_config(&self) -> DiagnosisConfig {
        let mut config = DiagnosisConfig::new()
            .with_planner(self.planner.to_planner_config(&self.llm))
            .with_evaluator(self.evaluator.to_evaluator_config(&self.llm))
            .with_summary_timeout(Duration::from_secs(self.diagnosis.summary_timeout_secs));
        config.summary_temperature = self.diagnosis.summary_temperature;
        config.max_result_bytes = self.diagnosis.max_result_bytes;
        config
    }
}

/// Language-model collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `ollama` or `openai`
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override; empty keeps the provider default
    #[serde(default)]
    pub model: String,
    /// Endpoint override; empty keeps the provider default
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn model(&self) -> Option<&str> {
        non_empty(&self.model)
    }

    pub fn base_url(&self) -> Option<&str> {
        non_empty(&self.base_url)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            base_url: String::new(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_llm_timeout() -> u64 {
    120
}

/// Network-test collaborator service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_tools_url")]
    pub base_url: String,
    #[serde(default = "default_tools_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub strip_unknown_params: bool,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn to_runner_config(&self) -> RunnerConfig {
        RunnerConfig::new(self.timeout()).with_strip_unknown(self.strip_unknown_params)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tools_url(),
            timeout_secs: default_tools_timeout(),
            strip_unknown_params: false,
        }
    }
}

fn default_tools_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_tools_timeout() -> u64 {
    60
}

/// Plan Builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerAppConfig {
    #[serde(default = "default_planner_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_problem_chars")]
    pub max_problem_chars: usize,
    #[serde(default = "default_planner_timeout")]
    pub timeout_secs: u64,
}

impl PlannerAppConfig {
    fn to_planner_config(&self, llm: &LlmConfig) -> PlannerConfig {
        let config = PlannerConfig::new()
            .with_temperature(self.temperature)
            .with_max_problem_chars(self.max_problem_chars)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match llm.model() {
            Some(model) => config.with_model(model),
            None => config,
        }
    }
}

impl Default for PlannerAppConfig {
    fn default() -> Self {
        Self {
            temperature: default_planner_temperature(),
            max_problem_chars: default_max_problem_chars(),
            timeout_secs: default_planner_timeout(),
        }
    }
}

fn default_planner_temperature() -> f32 {
    0.3
}
fn default_max_problem_chars() -> usize {
    2000
}
fn default_planner_timeout() -> u64 {
    30
}

/// Result Evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorAppConfig {
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_evaluator_temperature")]
    pub temperature: f32,
}

impl EvaluatorAppConfig {
    fn to_evaluator_config(&self, llm: &LlmConfig) -> EvaluatorConfig {
        let mut config = EvaluatorConfig::default()
            .with_model_timeout(Duration::from_secs(self.model_timeout_secs));
        config.temperature = self.temperature;
        match llm.model() {
            Some(model) => config.with_model(model),
            None => config,
        }
    }
}

impl Default for EvaluatorAppConfig {
    fn default() -> Self {
        Self {
            model_timeout_secs: default_model_timeout(),
            temperature: default_evaluator_temperature(),
        }
    }
}

fn default_model_timeout() -> u64 {
    10
}
fn default_evaluator_temperature() -> f32 {
    0.2
}

/// Final summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisAppConfig {
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
    #[serde(default = "default_summary_timeout")]
    pub summary_timeout_secs: u64,
    #[serde(default = "default_max_result_bytes")]
    pub max_result_bytes: usize,
}

impl Default for DiagnosisAppConfig {
    fn default() -> Self {
        Self {
            summary_temperature: default_summary_temperature(),
            summary_timeout_secs: default_summary_timeout(),
            max_result_bytes: default_max_result_bytes(),
        }
    }
}

fn default_summary_temperature() -> f32 {
    0.5
}
fn default_summary_timeout() -> u64 {
    60
}
fn default_max_result_bytes() -> usize {
    1500
}

/// Session Monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorAppConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_target")]
    pub default_target: String,
    #[serde(default = "default_mode")]
    pub default_mode: String,
    #[serde(default = "default_duration")]
    pub default_duration_secs: u64,
}

impl MonitorAppConfig {
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig::default()
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
            .with_max_retries(self.max_retries)
    }

    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            target: self.default_target.clone(),
            mode: self.default_mode.clone(),
            duration_secs: self.default_duration_secs,
        }
    }
}

impl Default for MonitorAppConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_retries: default_max_retries(),
            default_target: default_target(),
            default_mode: default_mode(),
            default_duration_secs: default_duration(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5
}
fn default_max_retries() -> u32 {
    3
}
fn default_target() -> String {
    "unknown".to_string()
}
fn default_mode() -> String {
    "auto".to_string()
}
fn default_duration() -> u64 {
    30
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
