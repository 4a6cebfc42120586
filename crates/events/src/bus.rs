//! Event bus abstraction for decoupled event emission.
//!
//! The monitor publishes through a plain callback; the bus is what turns that
//! into topic/payload messages for the UI shell, and lets the forwarding be
//! tested without a UI attached.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Trait for emitting events to subscribers.
pub trait EventBus: Send + Sync {
    /// Emit an event with a JSON payload.
    ///
    /// # Arguments
    /// * `topic` - Event name/topic (e.g., "jetclock:wifi.mode")
    /// * `payload` - JSON payload to emit
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

/// Type alias for shared event bus reference.
pub type EventBusRef = Arc<dyn EventBus>;

/// A single emitted event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// In-memory event bus for testing.
///
/// Captures all emitted events for later inspection.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<EmittedEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured events.
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.lock().clone()
    }

    /// Get events for a specific topic.
    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.lock()
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EmittedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.lock().push(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// Fan-out bus backed by a tokio broadcast channel.
///
/// Emitting never blocks the caller. Subscribers that fall more than
/// `capacity` events behind skip ahead and see a lag error.
pub struct BroadcastEventBus {
    sender: broadcast::Sender<EmittedEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EmittedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EventBus for BroadcastEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        let event = EmittedEvent {
            topic: topic.to_string(),
            payload,
        };

        if self.sender.send(event).is_err() {
            tracing::debug!(topic, "no subscribers, event dropped");
        }
    }
}
