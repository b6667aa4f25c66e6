//! Event bus for inter-component communication
//!
//! Uses tokio::sync::broadcast for pub/sub pattern.
//! Events are typed and can carry payloads; the SSE endpoint forwards them to
//! dashboard clients as JSON.

pub mod events;

pub use events::*;

use std::sync::Arc;
use tokio::sync::broadcast;

/// Event bus handle for publishing and subscribing
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create with default capacity (256 events)
    pub fn default() -> Self {
        Self::new(256)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: BusEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Publish a transient user-facing notification
    pub fn notify(
        &self,
        level: NotificationLevel,
        title: impl Into<String>,
        body: impl Into<String>,
    ) {
        self.publish(BusEvent::Notification {
            level,
            title: title.into(),
            body: body.into(),
        });
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Shared event bus wrapped in Arc for thread-safe sharing
pub type SharedBus = Arc<EventBus>;

/// Create a new shared event bus
pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pubsub() {
        let bus = create_bus();
        let mut rx = bus.subscribe();

        bus.publish(BusEvent::ScanStarted);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, BusEvent::ScanStarted));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = create_bus();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(BusEvent::ScanFinished { discovered: 2 });

        assert!(matches!(
            rx1.recv().await.unwrap(),
            BusEvent::ScanFinished { discovered: 2 }
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            BusEvent::ScanFinished { discovered: 2 }
        ));
    }

    #[tokio::test]
    async fn test_notify_helper() {
        let bus = create_bus();
        let mut rx = bus.subscribe();

        bus.notify(NotificationLevel::Success, "Connected Successfully", "ok");

        match rx.recv().await.unwrap() {
            BusEvent::Notification { level, title, .. } => {
                assert_eq!(level, NotificationLevel::Success);
                assert_eq!(title, "Connected Successfully");
            }
            other => panic!("unexpected event: {:?}", other.event_type()),
        }
    }
}
