//! Entity state storage

use std::collections::HashMap;
use std::sync::Arc;

use casa_core::events::StateChangedData;
use casa_core::{Context, EntityId, State};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::EventBus;

/// Capacity of the state-change broadcast channel
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Tracks the current state of every entity
///
/// Writes produce a [`StateChangedData`] on the typed change channel and
/// mirror it onto the event bus for generic listeners. `last_changed` is
/// preserved across writes that keep the same state value.
pub struct StateStore {
    states: DashMap<String, State>,
    changes: broadcast::Sender<StateChangedData>,
    bus: Arc<EventBus>,
}

impl StateStore {
    /// Create a new store firing onto the given event bus
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            states: DashMap::new(),
            changes: broadcast::channel(CHANGE_CHANNEL_CAPACITY).0,
            bus,
        }
    }

    /// Write the state of an entity
    pub fn set(
        &self,
        entity_id: EntityId,
        value: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> State {
        let key = entity_id.to_string();
        let old_state = self.states.get(&key).map(|s| s.clone());

        let new_state = match &old_state {
            Some(existing) => existing.with_update(value, attributes, context.clone()),
            None => State::new(entity_id.clone(), value, attributes, context.clone()),
        };

        debug!(
            entity_id = %key,
            state = %new_state.state,
            "state written"
        );

        self.states.insert(key, new_state.clone());

        let change = StateChangedData {
            entity_id,
            old_state,
            new_state: Some(new_state.clone()),
        };
        let _ = self.changes.send(change.clone());
        self.bus.fire_typed(change, context);

        new_state
    }

    /// Current state of an entity
    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Current state value of an entity as a string
    pub fn get_value(&self, entity_id: &str) -> Option<String> {
        self.states.get(entity_id).map(|s| s.state.clone())
    }

    /// Snapshot of all states
    pub fn all(&self) -> Vec<State> {
        self.states.iter().map(|r| r.value().clone()).collect()
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> broadcast::Receiver<StateChangedData> {
        self.changes.subscribe()
    }

    /// Number of tracked entities
    pub fn entity_count(&self) -> usize {
        self.states.len()
    }
}
