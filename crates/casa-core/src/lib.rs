//! Core types shared by every casa crate
//!
//! Provides the fundamental vocabulary of the system: EntityId, State,
//! Context, ServiceCall, and the event types carried on the hub.

mod context;
mod entity_id;
mod event;
mod service_call;
mod state;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use service_call::ServiceCall;
pub use state::State;

/// State value for an entity the host cannot reach
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State value for an entity with no known state yet
pub const STATE_UNKNOWN: &str = "unknown";

/// Well-known event types and their payloads
pub mod events {
    use super::*;

    /// Fired whenever an entity's state is written
    pub const STATE_CHANGED: &str = "state_changed";

    /// Fired when a notification action button is pressed on a phone
    pub const NOTIFICATION_ACTION: &str = "mobile_app_notification_action";

    /// Fired for every outbound service invocation
    pub const CALL_SERVICE: &str = "call_service";

    /// Payload of STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl StateChangedData {
        /// True when the state value itself changed, not just attributes
        pub fn value_changed(&self) -> bool {
            match (&self.old_state, &self.new_state) {
                (Some(old), Some(new)) => old.state != new.state,
                (None, Some(_)) | (Some(_), None) => true,
                (None, None) => false,
            }
        }

        /// The new state value, if the entity still exists
        pub fn new_value(&self) -> Option<&str> {
            self.new_state.as_ref().map(|s| s.state.as_str())
        }

        /// The previous state value, if there was one
        pub fn old_value(&self) -> Option<&str> {
            self.old_state.as_ref().map(|s| s.state.as_str())
        }
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }

    /// Payload of NOTIFICATION_ACTION events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct NotificationActionData {
        /// The action identifier chosen in the notification
        pub action: String,
        /// Any extra payload the companion app sent along
        #[serde(default)]
        pub data: serde_json::Value,
    }

    impl EventData for NotificationActionData {
        fn event_type() -> &'static str {
            NOTIFICATION_ACTION
        }
    }

    /// Payload of CALL_SERVICE events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct CallServiceData {
        pub domain: String,
        pub service: String,
        pub service_data: serde_json::Value,
    }

    impl EventData for CallServiceData {
        fn event_type() -> &'static str {
            CALL_SERVICE
        }
    }
}
