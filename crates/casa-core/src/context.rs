//! Context type for tracing what caused a state write or service call

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Tracks the origin and causality of events and service calls
///
/// Every state write and service call carries a Context, so a chain of
/// automation reactions can be traced back to the event that started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this context (ULID)
    pub id: String,

    /// Parent context ID when this action was caused by another
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Context {
    /// Create a fresh root context
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            parent_id: None,
        }
    }

    /// Create a child context with this context as parent
    pub fn child(&self) -> Self {
        Self {
            id: Ulid::new().to_string(),
            parent_id: Some(self.id.clone()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_links_to_parent() {
        let root = Context::new();
        let child = root.child();

        assert_ne!(root.id, child.id);
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
        assert!(root.parent_id.is_none());
    }
}
