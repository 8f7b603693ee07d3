//! Service call type for invoking host services

use crate::Context;
use serde::{Deserialize, Serialize};

/// A call to a host service
///
/// Services are how automations act on the world: turning on a light,
/// pushing a notification, speaking a TTS message. Each service lives in a
/// domain and takes a JSON mapping of arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    /// The domain the service belongs to (e.g. "notify", "tts", "homeassistant")
    pub domain: String,

    /// The service name (e.g. "mobile_app_javier_phone", "turn_on")
    pub service: String,

    /// Arguments passed to the service
    pub service_data: serde_json::Value,

    /// Context tracking what initiated this call
    pub context: Context,
}

impl ServiceCall {
    /// Create a new service call
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: serde_json::Value,
        context: Context,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
            context,
        }
    }

    /// The full `domain.service` identifier
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Deserialize an argument by key
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.service_data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Extract entity_id argument(s), accepting a string or an array
    pub fn entity_ids(&self) -> Vec<String> {
        match self.service_data.get("entity_id") {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(arr)) => arr
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => vec![],
        }
    }
}
