//! The narrow typed interface to the automation host

use async_trait::async_trait;
use casa_core::events::StateChangedData;
use casa_core::{Event, State};
use tokio::sync::broadcast;

use crate::HostResult;

/// What automations are allowed to ask of the host
///
/// Three capabilities only: read current state, invoke a named service,
/// and subscribe to change notifications. Presence facts are never cached
/// on this side; every query reads live state.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Current state of a named entity, if it exists
    fn get_state(&self, entity_id: &str) -> Option<State>;

    /// Snapshot of every entity state the host knows about
    fn all_states(&self) -> Vec<State>;

    /// Invoke a named service with a mapping of arguments
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> HostResult<()>;

    /// Subscribe to state transitions of all entities
    fn subscribe_states(&self) -> broadcast::Receiver<StateChangedData>;

    /// Subscribe to a named event type
    fn subscribe_event(&self, event_type: &str) -> broadcast::Receiver<Event<serde_json::Value>>;

    /// Current state value of an entity as a string
    fn state_value(&self, entity_id: &str) -> Option<String> {
        self.get_state(entity_id).map(|s| s.state)
    }

    /// Check whether an entity is in a specific state
    fn is_state(&self, entity_id: &str, value: &str) -> bool {
        self.state_value(entity_id).as_deref() == Some(value)
    }
}
