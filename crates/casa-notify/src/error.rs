//! Router error types

use thiserror::Error;

/// Configuration errors surfaced by the router
///
/// These indicate a wiring mistake in the calling automation, not a
/// transient delivery fault, so they fail fast and are never retried.
/// Delivery failures are logged per channel and do not surface here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// The target is not a known audience token
    #[error("unknown audience token '{0}'")]
    UnknownAudience(String),

    /// The request named no targets at all
    #[error("notification has no targets")]
    NoTargets,
}
