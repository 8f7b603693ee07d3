//! Entity ID type: a validated `domain.object_id` pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    MissingSeparator,

    #[error("domain and object_id cannot be empty")]
    EmptyPart,

    #[error("'{0}' contains invalid characters (lowercase alphanumeric and inner underscores only)")]
    InvalidChars(String),
}

/// An entity identifier such as `person.javier` or `binary_sensor.front_door_state`
///
/// The domain names the kind of entity, the object_id names the instance.
/// Both parts are lowercase alphanumeric with underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    /// Create an EntityId from domain and object_id parts
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if domain.is_empty() || object_id.is_empty() {
            return Err(EntityIdError::EmptyPart);
        }
        for part in [&domain, &object_id] {
            if !Self::is_valid_part(part) {
                return Err(EntityIdError::InvalidChars(part.clone()));
            }
        }

        Ok(Self { domain, object_id })
    }

    /// The domain part (e.g. "binary_sensor")
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The object_id part (e.g. "front_door_state")
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    fn is_valid_part(s: &str) -> bool {
        if s.starts_with('_') || s.ends_with('_') {
            return false;
        }
        s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        match other.split_once('.') {
            Some((domain, object_id)) => domain == self.domain && object_id == self.object_id,
            None => false,
        }
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !object_id.contains('.') => {
                Self::new(domain, object_id)
            }
            _ => Err(EntityIdError::MissingSeparator),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_ids() {
        let id: EntityId = "person.javier".parse().unwrap();
        assert_eq!(id.domain(), "person");
        assert_eq!(id.object_id(), "javier");
        assert_eq!(id.to_string(), "person.javier");

        assert!("binary_sensor.front_door_state".parse::<EntityId>().is_ok());
        assert!("input_boolean.house_occupied".parse::<EntityId>().is_ok());
    }

    #[test]
    fn rejects_missing_separator() {
        assert_eq!(
            "no_separator".parse::<EntityId>().unwrap_err(),
            EntityIdError::MissingSeparator
        );
        assert_eq!(
            "too.many.parts".parse::<EntityId>().unwrap_err(),
            EntityIdError::MissingSeparator
        );
    }

    #[test]
    fn rejects_empty_parts() {
        assert_eq!(
            ".javier".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyPart
        );
        assert_eq!(
            "person.".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyPart
        );
    }

    #[test]
    fn rejects_invalid_chars() {
        assert!(matches!(
            "Person.javier".parse::<EntityId>(),
            Err(EntityIdError::InvalidChars(_))
        ));
        assert!(matches!(
            "person._javier".parse::<EntityId>(),
            Err(EntityIdError::InvalidChars(_))
        ));
        assert!(matches!(
            "with-dash.thing".parse::<EntityId>(),
            Err(EntityIdError::InvalidChars(_))
        ));
    }

    #[test]
    fn compares_against_string_slices() {
        let id: EntityId = "person.javier".parse().unwrap();
        assert!(id == "person.javier");
        assert!(id != "person.andy");
        assert!(id != "not_an_entity");
    }

    #[test]
    fn serde_roundtrip_as_string() {
        let id = EntityId::new("switch", "ls_kitchen").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"switch.ls_kitchen\"");

        let parsed: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
