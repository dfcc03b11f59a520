//! Monitor types
//!
//! - `CaptureSession`: one monitored background capture
//! - `SessionStatus`: its lifecycle
//! - `MonitorConfig`, `SessionDefaults`: settings
//! - `MonitorEvent`: what listeners receive

use chrono::{DateTime, Utc};
use netpulse_tools::CaptureStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Being polled
    Running,
    /// Capture finished; analysis requested
    Completed,
    /// Stopped by the user
    Stopped,
    /// Polling gave up
    Error,
}

impl SessionStatus {
    /// Whether no further polling happens in this status
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

/// A monitored background capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSession {
    /// Externally assigned id
    pub session_id: String,
    /// Capture target
    pub target: String,
    /// Capture mode
    pub mode: String,
    /// When monitoring started
    pub start_time: DateTime<Utc>,
    /// Requested capture length in seconds
    pub duration: u64,
    /// Whether a polling loop is active
    pub is_monitoring: bool,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Consecutive transient poll failures
    pub retry_count: u32,
    /// Packets captured so far
    pub packet_count: u64,
    /// Seconds since the capture started
    pub elapsed_time: f64,
    /// Seconds left, when known
    pub remaining_time: Option<f64>,
    /// Last poll error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Analysis of the finished capture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
}

impl CaptureSession {
    /// New session with the given defaults
    #[must_use]
    pub fn new(session_id: impl Into<String>, defaults: &SessionDefaults) -> Self {
        Self {
            session_id: session_id.into(),
            target: defaults.target.clone(),
            mode: defaults.mode.clone(),
            start_time: Utc::now(),
            duration: defaults.duration_secs,
            is_monitoring: false,
            status: SessionStatus::Running,
            retry_count: 0,
            packet_count: 0,
            elapsed_time: 0.0,
            remaining_time: None,
            last_error: None,
            analysis: None,
        }
    }

    /// Session described by the parameters its capture was started with;
    /// `target`, `mode` and `duration` override the defaults when present
    #[must_use]
    pub fn from_tool_params(
        session_id: impl Into<String>,
        params: &Value,
        defaults: &SessionDefaults,
    ) -> Self {
        let mut session = Self::new(session_id, defaults);
        if let Some(target) = params.get("target").and_then(Value::as_str) {
            session.target = target.to_string();
        }
        if let Some(mode) = params.get("mode").and_then(Value::as_str) {
            session.mode = mode.to_string();
        }
        if let Some(duration) = params.get("duration").and_then(Value::as_u64) {
            session.duration = duration;
        }
        session
    }

    /// Set the target
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Set the mode
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Set the capture length
    #[must_use]
    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration = secs;
        self
    }

    pub(crate) fn apply(&mut self, status: &CaptureStatus) {
        self.packet_count = status.current_packet_count;
        self.elapsed_time = status.elapsed_time;
        self.remaining_time = status.remaining_time;
        self.retry_count = 0;
        self.last_error = None;
    }
}

/// Values for sessions discovered without explicit metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    /// Capture target
    pub target: String,
    /// Capture mode
    pub mode: String,
    /// Capture length in seconds
    pub duration_secs: u64,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            target: "unknown".to_string(),
            mode: "auto".to_string(),
            duration_secs: 30,
        }
    }
}

/// Configuration for the session monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between polls
    pub poll_interval: Duration,
    /// Transient failures tolerated before giving up
    pub max_retries: u32,
    /// Event channel capacity
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_retries: 3,
            event_capacity: 256,
        }
    }
}

impl MonitorConfig {
    /// Set the poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the retry bound
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Events published by the session monitor
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A polling loop was started
    Started {
        /// Session id
        session_id: String,
    },
    /// A poll succeeded
    StatusUpdated {
        /// Session id
        session_id: String,
        /// Packets captured so far
        packet_count: u64,
        /// Seconds since start
        elapsed_time: f64,
        /// Seconds left, when known
        remaining_time: Option<f64>,
    },
    /// Capture finished and its analysis arrived
    Completed {
        /// Session id
        session_id: String,
        /// Analysis payload
        analysis: Value,
    },
    /// Capture finished but analysis failed
    AnalysisFailed {
        /// Session id
        session_id: String,
        /// Failure description
        error: String,
    },
    /// Polling gave up
    Failed {
        /// Session id
        session_id: String,
        /// Last error
        error: String,
        /// Consecutive transient failures at the time
        retry_count: u32,
    },
    /// Monitoring stopped by request
    Stopped {
        /// Session id
        session_id: String,
    },
}

impl MonitorEvent {
    /// Session id of any event
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Started { session_id }
            | Self::StatusUpdated { session_id, .. }
            | Self::Completed { session_id, .. }
            | Self::AnalysisFailed { session_id, .. }
            | Self::Failed { session_id, .. }
            | Self::Stopped { session_id } => session_id,
        }
    }

    /// Whether this is the last event for its session
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::AnalysisFailed { .. } | Self::Failed { .. } | Self::Stopped { .. }
        )
    }
}
