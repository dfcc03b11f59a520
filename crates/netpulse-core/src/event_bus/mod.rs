//! EventBus - broadcast-based event system for diagnosis progress.
//!
//! The executor publishes lifecycle events so that the CLI and any other
//! subscriber can render progress without polling the session.

/// Broadcast channel and filtered feeds
pub mod bus;
/// Diagnosis lifecycle events
pub mod types;

pub use bus::{DiagnosisFeed, EventBus, DEFAULT_CAPACITY};
pub use types::DiagnosisEvent;
