//! Session Monitor - polling long-running capture sessions
//!
//! Each monitored session gets one spawned polling task driven by
//! `tokio::time::interval`. The session map is the single source of truth:
//! a poll that resumes after an await re-reads the entry and drops its
//! result if the session was stopped or restarted meanwhile.
//!
//! Lifecycle per session:
//! - success resets `retry_count`; a finished capture triggers exactly one analysis
//! - transient failures increment `retry_count`; exceeding `max_retries` ends in `error`
//! - fatal failures end in `error` on first occurrence
//! - `stop_monitoring` ends in `stopped` and is idempotent

pub mod discovery;
mod types;

pub use types::{CaptureSession, MonitorConfig, MonitorEvent, SessionDefaults, SessionStatus};

use netpulse_tools::CaptureBackend;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

struct SessionEntry {
    session: CaptureSession,
    /// Present while a polling loop is active
    cancel: Option<CancellationToken>,
}

impl SessionEntry {
    /// Tear down the loop, if any
    fn end(&mut self, status: SessionStatus) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.session.status = status;
        self.session.is_monitoring = false;
    }
}

struct MonitorInner {
    backend: Arc<dyn CaptureBackend>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    events: broadcast::Sender<MonitorEvent>,
    config: MonitorConfig,
    shutdown: CancellationToken,
}

#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Continue,
    Finished,
}

/// Tracks background capture sessions until they complete, fail or are stopped
#[derive(Clone)]
pub struct SessionMonitor {
    inner: Arc<MonitorInner>,
}

impl SessionMonitor {
    /// Create a monitor polling through `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn CaptureBackend>, config: MonitorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(MonitorInner {
                backend,
                sessions: RwLock::new(HashMap::new()),
                events,
                config,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Subscribe to monitor events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events.subscribe()
    }

    /// Start polling a session.
    ///
    /// Returns `false` without side effects when a loop for this id is
    /// already active. A finished session may be started again.
    pub async fn start_monitoring(&self, session: CaptureSession) -> bool {
        self.register(session, false).await
    }

    /// Start monitoring capture ids found in `history` that this monitor has
    /// never seen. Returns the ids started.
    pub async fn recover_missed<S: AsRef<str>>(
        &self,
        history: &[S],
        defaults: &SessionDefaults,
    ) -> Vec<String> {
        let mut started = Vec::new();
        for id in discovery::find_session_ids(history) {
            if self.register(CaptureSession::new(id.clone(), defaults), true).await {
                info!(session_id = %id, "Recovered missed capture session");
                started.push(id);
            }
        }
        started
    }

    /// Stop polling a session and ask the collaborator to stop the capture.
    ///
    /// Returns `false` when there was no active loop; that case is a no-op.
    #[instrument(skip(self))]
    pub async fn stop_monitoring(&self, session_id: &str) -> bool {
        {
            let mut sessions = self.inner.sessions.write().await;
            match sessions.get_mut(session_id) {
                Some(entry) if entry.cancel.is_some() => entry.end(SessionStatus::Stopped),
                _ => {
                    debug!("No active monitor, nothing to stop");
                    return false;
                }
            }
        }

        info!("Capture monitoring stopped");
        self.inner.publish(MonitorEvent::Stopped {
            session_id: session_id.to_string(),
        });

        match self.inner.backend.stop(session_id).await {
            Ok(response) if response.success => debug!("Collaborator stopped the capture"),
            Ok(response) => warn!(
                error = response.error.as_deref().unwrap_or("unknown"),
                "Collaborator refused to stop the capture"
            ),
            Err(e) => warn!(error = %e, "Stop request failed"),
        }
        true
    }

    /// Tear down every polling loop; sessions keep their last status
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let mut sessions = self.inner.sessions.write().await;
        for entry in sessions.values_mut() {
            if let Some(token) = entry.cancel.take() {
                token.cancel();
                entry.session.is_monitoring = false;
            }
        }
    }

    /// Snapshot of one session
    pub async fn session(&self, session_id: &str) -> Option<CaptureSession> {
        self.inner
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.session.clone())
    }

    /// Snapshot of every known session
    pub async fn sessions(&self) -> Vec<CaptureSession> {
        let mut all: Vec<CaptureSession> = self
            .inner
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.session.clone())
            .collect();
        all.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        all
    }

    /// Whether a polling loop is active for the id
    pub async fn is_monitoring(&self, session_id: &str) -> bool {
        self.inner
            .sessions
            .read()
            .await
            .get(session_id)
            .is_some_and(|entry| entry.cancel.is_some())
    }

    /// Number of active polling loops
    pub async fn active_count(&self) -> usize {
        self.inner
            .sessions
            .read()
            .await
            .values()
            .filter(|entry| entry.cancel.is_some())
            .count()
    }

    async fn register(&self, mut session: CaptureSession, skip_known: bool) -> bool {
        if self.inner.shutdown.is_cancelled() {
            warn!(session_id = %session.session_id, "Monitor is shut down, not starting");
            return false;
        }

        let session_id = session.session_id.clone();
        let token = self.inner.shutdown.child_token();
        {
            let mut sessions = self.inner.sessions.write().await;
            if let Some(existing) = sessions.get(&session_id) {
                if skip_known || existing.cancel.is_some() {
                    debug!(session_id = %session_id, "Session already monitored");
                    return false;
                }
            }

            session.status = SessionStatus::Running;
            session.is_monitoring = true;
            session.retry_count = 0;
            sessions.insert(
                session_id.clone(),
                SessionEntry {
                    session,
                    cancel: Some(token.clone()),
                },
            );
        }

        info!(session_id = %session_id, "Capture monitoring started");
        self.inner.publish(MonitorEvent::Started {
            session_id: session_id.clone(),
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run(session_id, token).await;
        });
        true
    }
}

impl MonitorInner {
    fn publish(&self, event: MonitorEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn run(self: Arc<Self>, session_id: String, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick fires immediately
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }
            if self.poll_once(&session_id, &token).await == PollOutcome::Finished {
                break;
            }
        }
        debug!(session_id = %session_id, "Polling loop exited");
    }

    #[instrument(skip(self, token))]
    async fn poll_once(&self, session_id: &str, token: &CancellationToken) -> PollOutcome {
        let result = self.backend.status(session_id).await;

        let mut sessions = self.sessions.write().await;
        // Stopped or restarted while the request was in flight
        if token.is_cancelled() {
            return PollOutcome::Finished;
        }
        let Some(entry) = sessions.get_mut(session_id) else {
            return PollOutcome::Finished;
        };

        match result {
            Ok(status) => {
                entry.session.apply(&status);
                let update = MonitorEvent::StatusUpdated {
                    session_id: session_id.to_string(),
                    packet_count: status.current_packet_count,
                    elapsed_time: status.elapsed_time,
                    remaining_time: status.remaining_time,
                };

                if !status.is_finished() {
                    drop(sessions);
                    self.publish(update);
                    return PollOutcome::Continue;
                }

                entry.end(SessionStatus::Completed);
                drop(sessions);
                info!(packets = status.current_packet_count, "Capture completed");
                self.publish(update);
                self.analyze(session_id).await;
                PollOutcome::Finished
            }
            Err(e) if e.is_transient() => {
                entry.session.retry_count += 1;
                entry.session.last_error = Some(e.to_string());
                let retries = entry.session.retry_count;

                if retries <= self.config.max_retries {
                    warn!(retry = retries, error = %e, "Transient poll failure, will retry");
                    return PollOutcome::Continue;
                }

                entry.end(SessionStatus::Error);
                drop(sessions);
                warn!(retries, error = %e, "Poll retries exhausted");
                self.publish(MonitorEvent::Failed {
                    session_id: session_id.to_string(),
                    error: e.to_string(),
                    retry_count: retries,
                });
                PollOutcome::Finished
            }
            Err(e) => {
                entry.session.last_error = Some(e.to_string());
                let retries = entry.session.retry_count;
                entry.end(SessionStatus::Error);
                drop(sessions);
                warn!(error = %e, "Fatal poll failure");
                self.publish(MonitorEvent::Failed {
                    session_id: session_id.to_string(),
                    error: e.to_string(),
                    retry_count: retries,
                });
                PollOutcome::Finished
            }
        }
    }

    async fn analyze(&self, session_id: &str) {
        let event = match self.backend.analyze(session_id).await {
            Ok(response) if response.success => {
                let mut sessions = self.sessions.write().await;
                if let Some(entry) = sessions.get_mut(session_id) {
                    entry.session.analysis = Some(response.data.clone());
                }
                MonitorEvent::Completed {
                    session_id: session_id.to_string(),
                    analysis: response.data,
                }
            }
            Ok(response) => MonitorEvent::AnalysisFailed {
                session_id: session_id.to_string(),
                error: response
                    .error
                    .unwrap_or_else(|| "analysis reported failure".to_string()),
            },
            Err(e) => MonitorEvent::AnalysisFailed {
                session_id: session_id.to_string(),
                error: e.to_string(),
            },
        };

        if let MonitorEvent::AnalysisFailed { error, .. } = &event {
            warn!(session_id, error = %error, "Capture analysis failed");
        }
        self.publish(event);
    }
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("config", &self.inner.config)
            .finish()
    }
}
