//! Diagnostician struct and builder methods

use super::config::DiagnosisConfig;
use crate::evaluator::Evaluator;
use crate::event_bus::{DiagnosisEvent, EventBus};
use crate::monitor::{SessionDefaults, SessionMonitor};
use crate::planner::Planner;
use netpulse_llm::LlmProvider;
use netpulse_tools::ToolRunner;
use std::sync::Arc;

/// Drives diagnosis sessions through plan, execute, evaluate and complete
pub struct Diagnostician {
    pub(super) planner: Planner,
    pub(super) runner: ToolRunner,
    pub(super) evaluator: Evaluator,
    pub(super) provider: Arc<dyn LlmProvider>,
    pub(super) event_bus: Option<Arc<EventBus>>,
    pub(super) capture_monitor: Option<(SessionMonitor, SessionDefaults)>,
    pub(super) config: DiagnosisConfig,
}

impl Diagnostician {
    /// Create a diagnostician; the provider serves planning, evaluation and summaries
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, runner: ToolRunner, config: DiagnosisConfig) -> Self {
        let planner = Planner::new(
            Arc::clone(&provider),
            runner.shared_catalog(),
            config.planner.clone(),
        );
        let evaluator = Evaluator::new(Arc::clone(&provider), config.evaluator.clone());

        Self {
            planner,
            runner,
            evaluator,
            provider,
            event_bus: None,
            capture_monitor: None,
            config,
        }
    }

    /// Publish lifecycle events on this bus
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Hand capture sessions started by executed tools to `monitor`.
    ///
    /// `defaults` fill in target, mode and duration the tool call left out.
    #[must_use]
    pub fn with_session_monitor(mut self, monitor: SessionMonitor, defaults: SessionDefaults) -> Self {
        self.capture_monitor = Some((monitor, defaults));
        self
    }

    /// Session monitor receiving capture sessions, if configured
    #[must_use]
    pub fn session_monitor(&self) -> Option<&SessionMonitor> {
        self.capture_monitor.as_ref().map(|(monitor, _)| monitor)
    }

    /// Event bus, if configured
    #[must_use]
    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    /// Tool runner
    #[must_use]
    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    /// Planner
    #[must_use]
    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Evaluator
    #[must_use]
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &DiagnosisConfig {
        &self.config
    }

    /// Name of the language-model provider
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub(super) fn emit(&self, event: DiagnosisEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl std::fmt::Debug for Diagnostician {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostician")
            .field("provider", &self.provider.name())
            .field("runner", &self.runner)
            .field("config", &self.config)
            .finish()
    }
}
