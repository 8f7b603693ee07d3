//! Notification request type

use serde_json::Value;

/// How urgent a notification is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Routine message; an empty resolution is a silent no-op
    #[default]
    Normal,
    /// Must-reach message; escalates to the fallback channel when the
    /// resolution comes up empty
    High,
}

/// A single notification to route and dispatch
///
/// Built per call, never persisted, discarded after dispatch.
#[derive(Debug, Clone)]
pub struct NotifyRequest {
    /// Audience tokens to resolve, in order
    pub targets: Vec<String>,

    /// Message body
    pub message: String,

    /// Optional title; speech channels ignore it
    pub title: Option<String>,

    /// Extra payload for the companion app (actions, tags, click targets)
    pub data: Option<Value>,

    /// Urgency
    pub priority: Priority,
}

impl NotifyRequest {
    /// Create a request for the given targets and message
    pub fn new<T: Into<String>>(targets: impl IntoIterator<Item = T>, message: impl Into<String>) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            message: message.into(),
            title: None,
            data: None,
            priority: Priority::Normal,
        }
    }

    /// Set the title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach a companion-app data payload
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Mark the request high priority
    pub fn high_priority(mut self) -> Self {
        self.priority = Priority::High;
        self
    }
}
