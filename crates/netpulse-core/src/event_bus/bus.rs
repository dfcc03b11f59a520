use super::types::DiagnosisEvent;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;
use uuid::Uuid;

/// Default number of buffered events per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for diagnosis lifecycle events.
///
/// Publishing never blocks; a subscriber that falls more than the channel
/// capacity behind loses the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DiagnosisEvent>,
}

impl EventBus {
    /// Bus buffering `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on, for all diagnoses
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DiagnosisEvent> {
        self.sender.subscribe()
    }

    /// Receive only the events of one diagnosis
    #[must_use]
    pub fn subscribe_to(&self, diagnosis_id: Uuid) -> DiagnosisFeed {
        DiagnosisFeed {
            diagnosis_id,
            receiver: self.sender.subscribe(),
        }
    }

    /// Returns how many subscribers saw the event (zero when nobody listens).
    pub fn publish(&self, event: DiagnosisEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Subscription filtered to a single diagnosis.
#[derive(Debug)]
pub struct DiagnosisFeed {
    diagnosis_id: Uuid,
    receiver: broadcast::Receiver<DiagnosisEvent>,
}

impl DiagnosisFeed {
    /// Diagnosis this feed follows
    #[must_use]
    pub fn diagnosis_id(&self) -> Uuid {
        self.diagnosis_id
    }

    /// Wait for the next matching event. `None` once the bus is gone.
    ///
    /// Lag is logged and skipped over.
    pub async fn next(&mut self) -> Option<DiagnosisEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.diagnosis_id() == self.diagnosis_id => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(diagnosis_id = %self.diagnosis_id, skipped, "Diagnosis events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the matching events already buffered without waiting
    pub fn drain(&mut self) -> Vec<DiagnosisEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.diagnosis_id() == self.diagnosis_id => events.push(event),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
            }
        }
    }
}
