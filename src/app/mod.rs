//! Application wiring
//!
//! Loads configuration and assembles the collaborators the CLI drives.

pub mod config;
pub mod loader;
pub mod providers;

use anyhow::{Context, Result};
use netpulse_core::{Diagnostician, EventBus, SessionMonitor};
use netpulse_tools::{HttpCaptureBackend, HttpTransport, ToolCatalog, ToolRunner};
use std::sync::Arc;

pub use config::AppConfig;
pub use loader::load_config;

/// Build the diagnosis executor against the configured collaborators; capture
/// sessions started by its tools go to `monitor`
pub fn build_diagnostician(
    config: &AppConfig,
    event_bus: Arc<EventBus>,
    monitor: SessionMonitor,
) -> Result<Diagnostician> {
    let provider = providers::resolve_llm_provider(&config.llm)?;
    let transport = HttpTransport::new(&config.tools.base_url, config.tools.timeout())
        .context("Invalid tools.base_url")?;
    let runner = ToolRunner::new(
        Arc::new(ToolCatalog::builtin()),
        Arc::new(transport),
        config.tools.to_runner_config(),
    );

    Ok(Diagnostician::new(provider, runner, config.diagnosis_config())
        .with_event_bus(event_bus)
        .with_session_monitor(monitor, config.monitor.session_defaults()))
}

/// Build the capture-session monitor against the configured collaborator
pub fn build_monitor(config: &AppConfig) -> Result<SessionMonitor> {
    let backend = HttpCaptureBackend::new(&config.tools.base_url, config.tools.timeout())
        .context("Invalid tools.base_url")?;
    Ok(SessionMonitor::new(
        Arc::new(backend),
        config.monitor.to_monitor_config(),
    ))
}
