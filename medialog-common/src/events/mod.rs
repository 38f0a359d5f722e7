//! Event types for the Medialog event system
//!
//! Provides shared event definitions and the EventBus.

mod order_types;

pub use order_types::{ItemStatus, Scope, ScopeKind};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Medialog event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MedialogEvent {
    /// A priority list scope now holds exactly the given order
    OrderSynced {
        user_id: Uuid,
        scope: Scope,
        /// Number of rows written
        item_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A sync failed; the scope may be empty or stale until the next
    /// successful sync
    OrderSyncFailed {
        user_id: Uuid,
        scope: Scope,
        /// Human-readable error message
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queued order was replaced by a newer one before it was written
    OrderSyncSuperseded {
        user_id: Uuid,
        scope: Scope,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MedialogEvent {
    /// Event type name, as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            MedialogEvent::OrderSynced { .. } => "OrderSynced",
            MedialogEvent::OrderSyncFailed { .. } => "OrderSyncFailed",
            MedialogEvent::OrderSyncSuperseded { .. } => "OrderSyncSuperseded",
        }
    }
}

/// Broadcast channel shared by everything that emits or observes events
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MedialogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use medialog_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MedialogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MedialogEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(10);
        bus.emit_lossy(MedialogEvent::OrderSyncSuperseded {
            user_id: Uuid::new_v4(),
            scope: Scope::Global,
            timestamp: chrono::Utc::now(),
        });

        // Late subscribers see nothing from before they joined
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let category = Uuid::new_v4();
        bus.emit_lossy(MedialogEvent::OrderSynced {
            user_id: Uuid::new_v4(),
            scope: Scope::Category(category),
            item_count: 3,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            MedialogEvent::OrderSynced { scope, item_count, .. } => {
                assert_eq!(scope, Scope::Category(category));
                assert_eq!(item_count, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_type_matches_serde_tag() {
        let event = MedialogEvent::OrderSyncFailed {
            user_id: Uuid::new_v4(),
            scope: Scope::Global,
            message: "disk full".to_string(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["scope"]["kind"], "global");
        assert_eq!(json["message"], "disk full");
    }
}
