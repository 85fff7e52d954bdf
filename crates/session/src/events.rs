//! Event Bus - session lifecycle notifications
//!
//! Observers such as the demo binaries subscribe here. Nothing in the sync
//! path waits on a subscriber.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Connected { session_id: Uuid, peer: String },
    Flushed { session_id: Uuid, records: usize },
    Disconnected { session_id: Uuid },
    Failed { session_id: Uuid, reason: String },
}

/// Simple event bus using tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event); // Ignore error if no subscribers
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let session_id = Uuid::now_v7();

        bus.publish(SessionEvent::Flushed {
            session_id,
            records: 2,
        });

        match rx.recv().await {
            Ok(SessionEvent::Flushed { records: 2, .. }) => {}
            other => panic!("Expected Flushed event, got {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        EventBus::new().publish(SessionEvent::Disconnected {
            session_id: Uuid::now_v7(),
        });
    }
}
