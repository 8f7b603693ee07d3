//! Capturing host for tests
//!
//! An isolated [`HostApi`] implementation that records every outbound
//! service call instead of performing it, with helpers for seeding entity
//! states and firing events. Services can be marked as failing to exercise
//! partial-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use casa_core::events::StateChangedData;
use casa_core::{Context, Event, ServiceCall, State};
use serde_json::json;
use tokio::sync::broadcast;

use crate::{EventBus, HostApi, HostError, HostResult, StateStore};

/// A host stand-in with captured service calls
pub struct TestHub {
    bus: Arc<EventBus>,
    states: Arc<StateStore>,
    calls: Mutex<Vec<ServiceCall>>,
    failing: Mutex<HashSet<String>>,
}

impl TestHub {
    /// Create an empty test hub
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let states = Arc::new(StateStore::new(bus.clone()));
        Self {
            bus,
            states,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Seed an entity state
    pub fn set_state(&self, entity_id: &str, value: &str) -> State {
        self.set_state_with(entity_id, value, HashMap::new())
    }

    /// Seed an entity state with attributes
    pub fn set_state_with(
        &self,
        entity_id: &str,
        value: &str,
        attributes: HashMap<String, serde_json::Value>,
    ) -> State {
        let entity_id = entity_id.parse().expect("invalid entity_id in test");
        self.states.set(entity_id, value, attributes, Context::new())
    }

    /// Make subsequent calls to `domain.service` fail
    pub fn fail_service(&self, domain: &str, service: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(format!("{}.{}", domain, service));
    }

    /// Fire a named event on the bus
    pub fn fire_event(&self, event_type: &str, data: serde_json::Value) {
        self.bus.fire(Event::new(event_type, data, Context::new()));
    }

    /// Fire a notification action event, as the companion app would
    pub fn fire_notification_action(&self, action: &str) {
        self.fire_event(
            casa_core::events::NOTIFICATION_ACTION,
            json!({"action": action}),
        );
    }

    /// All captured service calls, in dispatch order
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Captured calls to a specific `domain.service`
    pub fn calls_to(&self, service_id: &str) -> Vec<ServiceCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.service_id() == service_id)
            .collect()
    }

    /// Assert exactly `n` calls were captured
    pub fn assert_call_count(&self, n: usize) {
        let calls = self.calls();
        assert_eq!(
            calls.len(),
            n,
            "expected {} service calls, got {:?}",
            n,
            calls.iter().map(|c| c.service_id()).collect::<Vec<_>>()
        );
    }
}

impl Default for TestHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostApi for TestHub {
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
        let call = ServiceCall::new(domain, service, data, Context::new());
        let service_id = call.service_id();
        self.calls.lock().unwrap().push(call);

        if self.failing.lock().unwrap().contains(&service_id) {
            return Err(HostError::CallFailed(format!(
                "{} is unreachable",
                service_id
            )));
        }
        Ok(())
    }

    fn subscribe_states(&self) -> broadcast::Receiver<StateChangedData> {
        self.states.subscribe()
    }

    fn subscribe_event(&self, event_type: &str) -> broadcast::Receiver<Event<serde_json::Value>> {
        self.bus.subscribe(event_type)
    }
}
