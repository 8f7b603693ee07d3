//! In-process host implementation

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use casa_core::events::{CallServiceData, StateChangedData};
use casa_core::{Context, EntityId, EntityIdError, Event, State};
use tokio::sync::broadcast;

use crate::{EventBus, HostApi, HostResult, ServiceRegistry, StateStore};

/// The in-process hub: event bus + state store + service registry
///
/// Implements [`HostApi`] for everything that runs inside this process.
/// Bridging the hub to an external platform is the embedder's concern.
pub struct LocalHub {
    /// Event bus for pub/sub communication
    pub bus: Arc<EventBus>,
    /// State store for entity states
    pub states: Arc<StateStore>,
    /// Registry for service handlers
    pub services: Arc<ServiceRegistry>,
}

impl LocalHub {
    /// Create a hub with empty state
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let states = Arc::new(StateStore::new(bus.clone()));
        let services = Arc::new(ServiceRegistry::new());

        Self {
            bus,
            states,
            services,
        }
    }

    /// Write an entity state, parsing the entity id
    pub fn set_state(
        &self,
        entity_id: &str,
        value: &str,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Result<State, EntityIdError> {
        let entity_id: EntityId = entity_id.parse()?;
        Ok(self
            .states
            .set(entity_id, value, attributes, Context::new()))
    }

    /// Fire a named event on the bus
    pub fn fire_event(&self, event_type: &str, data: serde_json::Value) {
        self.bus.fire(Event::new(event_type, data, Context::new()));
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostApi for LocalHub {
    fn get_state(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id)
    }

    fn all_states(&self) -> Vec<State> {
        self.states.all()
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> HostResult<()> {
        // Every invocation is mirrored on the bus before the handler runs
        self.bus.fire_typed(
            CallServiceData {
                domain: domain.to_string(),
                service: service.to_string(),
                service_data: data.clone(),
            },
            Context::new(),
        );
        self.services.call(domain, service, data, Context::new()).await
    }

    fn subscribe_states(&self) -> broadcast::Receiver<StateChangedData> {
        self.states.subscribe()
    }

    fn subscribe_event(&self, event_type: &str) -> broadcast::Receiver<Event<serde_json::Value>> {
        self.bus.subscribe(event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn hub_wires_store_and_registry() {
        let hub = LocalHub::new();
        let mut changes = hub.subscribe_states();

        hub.set_state("person.andy", "home", HashMap::new()).unwrap();
        assert!(hub.is_state("person.andy", "home"));

        let change = changes.recv().await.unwrap();
        assert_eq!(change.entity_id.to_string(), "person.andy");

        hub.services
            .register("homeassistant", "turn_on", |_call| async { Ok(()) });
        hub.call_service("homeassistant", "turn_on", json!({"entity_id": "light.stairs"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn service_calls_are_observable_as_events() {
        let hub = LocalHub::new();
        let mut rx = hub.subscribe_event(casa_core::events::CALL_SERVICE);

        hub.services
            .register("notify", "mobile_app_javier_phone", |_call| async { Ok(()) });
        hub.call_service("notify", "mobile_app_javier_phone", json!({"message": "hola"}))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.data["domain"], "notify");
        assert_eq!(event.data["service"], "mobile_app_javier_phone");
        assert_eq!(event.data["service_data"]["message"], "hola");
    }

    #[tokio::test]
    async fn fire_event_reaches_subscribers() {
        let hub = LocalHub::new();
        let mut rx = hub.subscribe_event("mobile_app_notification_action");

        hub.fire_event(
            "mobile_app_notification_action",
            json!({"action": "ENABLE_VACATION_MODE"}),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.data["action"], "ENABLE_VACATION_MODE");
    }
}
