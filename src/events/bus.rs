//! Broadcast fanout for queue activity
//!
//! One sender inside the queue manager, any number of receivers. A
//! receiver that falls behind skips the oldest events and keeps going;
//! emission never blocks and never fails.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::QueueEvent;

/// Fanout channel the queue manager publishes on
pub struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    /// Create a bus that buffers `capacity` events for slow receivers
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: called");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to whoever is listening
    ///
    /// With no subscribers the event simply disappears.
    pub fn emit(&self, event: QueueEvent) {
        debug!(event_type = event.event_type(), "EventBus::emit");
        // A send error only means nobody is subscribed right now
        let _ = self.tx.send(event);
    }

    /// Open a receiver for events emitted from this point on
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        debug!("EventBus::subscribe: called");
        self.tx.subscribe()
    }

    /// Number of receivers currently attached
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
