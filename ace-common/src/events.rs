//! Event types for the ACE Studio event system
//!
//! Provides the shared event definitions and the broadcast EventBus used to
//! notify presentation layers (SSE, CLI) of orchestration progress.
//!
//! Events are notifications only. The pending-entry store and the last
//! history snapshot remain the source of truth; a subscriber that lags and
//! drops events can always re-read the merged library view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// ACE Studio event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StudioEvent {
    /// Optimistic pending entry created for a new submission
    PendingCreated {
        temp_id: String,
        title: String,
        stage_labels: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Pending entry moved to the next progress stage
    StageAdvanced {
        temp_id: String,
        stage_index: usize,
        stage_label: String,
        timestamp: DateTime<Utc>,
    },

    /// Asset-creation call returned; pending entry bound to a server id
    PendingBound {
        temp_id: String,
        server_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Required step failed; the entry is frozen with an error
    PendingFailed {
        temp_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Authoritative record reached a terminal status; pending entry retired
    PendingRetired {
        temp_id: String,
        server_id: String,
        status: String,
        timestamp: DateTime<Utc>,
    },

    /// Pending entry deleted by the user
    PendingRemoved {
        temp_id: String,
        timestamp: DateTime<Utc>,
    },

    CoverRegenerationStarted {
        target_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Polled cover URL changed away from the pre-request value
    CoverRegenerationCompleted {
        target_id: String,
        cover_url: String,
        timestamp: DateTime<Utc>,
    },

    CoverRegenerationFailed {
        target_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Default model variant changed after an inventory poll
    DefaultVariantChanged {
        variant: String,
        timestamp: DateTime<Utc>,
    },
}

impl StudioEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            StudioEvent::PendingCreated { .. } => "PendingCreated",
            StudioEvent::StageAdvanced { .. } => "StageAdvanced",
            StudioEvent::PendingBound { .. } => "PendingBound",
            StudioEvent::PendingFailed { .. } => "PendingFailed",
            StudioEvent::PendingRetired { .. } => "PendingRetired",
            StudioEvent::PendingRemoved { .. } => "PendingRemoved",
            StudioEvent::CoverRegenerationStarted { .. } => "CoverRegenerationStarted",
            StudioEvent::CoverRegenerationCompleted { .. } => "CoverRegenerationCompleted",
            StudioEvent::CoverRegenerationFailed { .. } => "CoverRegenerationFailed",
            StudioEvent::DefaultVariantChanged { .. } => "DefaultVariantChanged",
        }
    }
}

/// Broadcast bus for StudioEvents
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<StudioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before lagging
    /// subscribers start dropping the oldest ones.
    ///
    /// ```
    /// use ace_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StudioEvent,
    ) -> Result<usize, broadcast::error::SendError<StudioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StudioEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(StudioEvent::PendingRemoved {
            temp_id: "temp-1".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "PendingRemoved");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let event = StudioEvent::DefaultVariantChanged {
            variant: "turbo".to_string(),
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_serialized_tag() {
        let event = StudioEvent::StageAdvanced {
            temp_id: "temp-1".to_string(),
            stage_index: 1,
            stage_label: "Writing lyrics".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StageAdvanced");
        assert_eq!(json["stage_index"], 1);
    }
}
