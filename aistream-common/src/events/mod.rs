//! Event types for the streamer event system
//!
//! Provides session event definitions and the EventBus used to publish them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// They are observability only: nothing in the delivery path waits on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Session started with a topic
    SessionStarted {
        session_id: Uuid,
        topic: String,
        /// Items created by the synchronous start cycle
        items_created: usize,
        timestamp: DateTime<Utc>,
    },

    /// Streaming disabled for the session
    StreamStopped {
        session_id: Uuid,
        /// Whether the playlist was cleared as well
        cleared: bool,
        timestamp: DateTime<Utc>,
    },

    /// A refill cycle claimed the guard and began generating
    RefillStarted {
        session_id: Uuid,
        topic: String,
        timestamp: DateTime<Utc>,
    },

    /// A refill attempt finished
    RefillCompleted {
        session_id: Uuid,
        /// Human-readable outcome ("refilled: 3 items", "skipped: no topic", ...)
        outcome: String,
        items_added: usize,
        timestamp: DateTime<Utc>,
    },

    /// An item was sent to the connected client
    ItemDelivered {
        session_id: Uuid,
        text: String,
        duration_ms: u64,
        /// Items still waiting after this one
        remaining: usize,
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::SessionStarted { .. } => "SessionStarted",
            StreamEvent::StreamStopped { .. } => "StreamStopped",
            StreamEvent::RefillStarted { .. } => "RefillStarted",
            StreamEvent::RefillCompleted { .. } => "RefillCompleted",
            StreamEvent::ItemDelivered { .. } => "ItemDelivered",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            StreamEvent::SessionStarted { session_id, .. }
            | StreamEvent::StreamStopped { session_id, .. }
            | StreamEvent::RefillStarted { session_id, .. }
            | StreamEvent::RefillCompleted { session_id, .. }
            | StreamEvent::ItemDelivered { session_id, .. } => *session_id,
        }
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use aistream_common::events::{EventBus, StreamEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(StreamEvent::StreamStopped {
///     session_id: uuid::Uuid::new_v4(),
///     cleared: false,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StreamEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StreamEvent,
    ) -> Result<usize, broadcast::error::SendError<StreamEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped(session_id: Uuid) -> StreamEvent {
        StreamEvent::StreamStopped {
            session_id,
            cleared: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(100);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(stopped(Uuid::new_v4())).is_err());

        // Lossy emit never fails
        bus.emit_lossy(stopped(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_eventbus_emit_with_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();

        assert_eq!(bus.emit(stopped(id)).unwrap(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "StreamStopped");
        assert_eq!(event.session_id(), id);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = StreamEvent::RefillCompleted {
            session_id: Uuid::new_v4(),
            outcome: "refilled: 2 items".to_string(),
            items_added: 2,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RefillCompleted");
        assert_eq!(json["items_added"], 2);
        assert_eq!(json["outcome"], "refilled: 2 items");
    }
}
