//! Event bus with per-type broadcast fan-out

use casa_core::{Context, Event, EventData, EventType};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Channel capacity per event type
const CHANNEL_CAPACITY: usize = 256;

/// Pub/sub broker for host events
///
/// Subscribers get a broadcast receiver per event type; firing an event
/// delivers it to every active subscriber of that type. Events with no
/// subscribers are dropped silently.
pub struct EventBus {
    senders: DashMap<EventType, broadcast::Sender<Event<serde_json::Value>>>,
}

impl EventBus {
    /// Create an empty event bus
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(
        &self,
        event_type: impl Into<EventType>,
    ) -> broadcast::Receiver<Event<serde_json::Value>> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "subscribing");

        self.senders
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Fire an event to all subscribers of its type
    pub fn fire(&self, event: Event<serde_json::Value>) {
        debug!(event_type = %event.event_type, "firing event");

        if let Some(sender) = self.senders.get(&event.event_type) {
            // A send error only means no active receivers
            let _ = sender.send(event);
        }
    }

    /// Fire a typed payload under its event type
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        let json = serde_json::to_value(&data).unwrap_or_default();
        self.fire(Event::new(T::event_type(), json, context));
    }

}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
