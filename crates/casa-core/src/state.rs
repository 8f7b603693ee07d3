//! State type for an entity's current value

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Context, EntityId, STATE_UNAVAILABLE, STATE_UNKNOWN};

/// The state of an entity at a point in time
///
/// Carries the current value as a string (the host convention), attached
/// attributes, and the timestamps needed to reason about how long the
/// entity has been in its current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// The entity this state belongs to
    pub entity_id: EntityId,

    /// The state value (e.g. "on", "home", "23.5", "unavailable")
    pub state: String,

    /// Attributes attached to the state
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the state value last changed
    pub last_changed: DateTime<Utc>,

    /// When the state was last written, even if the value was unchanged
    pub last_updated: DateTime<Utc>,

    /// Context of the write that produced this state
    pub context: Context,
}

impl State {
    /// Create a new state stamped with the current time
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    /// Produce the successor state, keeping `last_changed` when the value is unchanged
    pub fn with_update(
        &self,
        new_state: impl Into<String>,
        new_attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        let new_state = new_state.into();
        let value_changed = self.state != new_state;

        Self {
            entity_id: self.entity_id.clone(),
            state: new_state,
            attributes: new_attributes,
            last_changed: if value_changed { now } else { self.last_changed },
            last_updated: now,
            context,
        }
    }

    /// True when the host cannot reach the entity
    pub fn is_unavailable(&self) -> bool {
        self.state == STATE_UNAVAILABLE
    }

    /// True when the entity has no known state
    pub fn is_unknown(&self) -> bool {
        self.state == STATE_UNKNOWN
    }

    /// True for the binary "on" value
    pub fn is_on(&self) -> bool {
        self.state == "on"
    }

    /// Deserialize an attribute by key
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The state value parsed as a float, for numeric sensors
    pub fn numeric_value(&self) -> Option<f64> {
        self.state.parse().ok()
    }

    /// Seconds since the state value last changed
    pub fn seconds_since_change(&self) -> i64 {
        (Utc::now() - self.last_changed).num_seconds()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps and context are deliberately not compared
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: &str) -> State {
        State::new(
            "sensor.test".parse().unwrap(),
            value,
            HashMap::new(),
            Context::new(),
        )
    }

    #[test]
    fn update_preserves_last_changed_for_same_value() {
        let first = state("on");
        let second = first.with_update("on", HashMap::new(), Context::new());
        assert_eq!(second.last_changed, first.last_changed);
        assert!(second.last_updated >= first.last_updated);

        let third = second.with_update("off", HashMap::new(), Context::new());
        assert!(third.last_changed > first.last_changed);
    }

    #[test]
    fn numeric_value_parses_sensor_readings() {
        assert_eq!(state("42").numeric_value(), Some(42.0));
        assert_eq!(state("17.5").numeric_value(), Some(17.5));
        assert_eq!(state("unavailable").numeric_value(), None);
    }

    #[test]
    fn attribute_deserializes_by_key() {
        let mut attrs = HashMap::new();
        attrs.insert("latitude".to_string(), json!(8.9824));
        attrs.insert("friendly_name".to_string(), json!("Front Door"));
        let s = State::new(
            "zone.home".parse().unwrap(),
            "zoning",
            attrs,
            Context::new(),
        );

        assert_eq!(s.attribute::<f64>("latitude"), Some(8.9824));
        assert_eq!(
            s.attribute::<String>("friendly_name").as_deref(),
            Some("Front Door")
        );
        assert_eq!(s.attribute::<f64>("missing"), None);
    }

    #[test]
    fn availability_helpers() {
        assert!(state("unavailable").is_unavailable());
        assert!(state("unknown").is_unknown());
        assert!(state("on").is_on());
        assert!(!state("off").is_on());
    }
}
