//! Error types for host operations

use thiserror::Error;

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors surfaced by the host interface
#[derive(Debug, Clone, Error)]
pub enum HostError {
    /// No handler registered under `domain.service`
    #[error("service not found: {domain}.{service}")]
    ServiceNotFound { domain: String, service: String },

    /// The service handler ran and reported a failure
    #[error("service call failed: {0}")]
    CallFailed(String),

    /// The service arguments could not be used
    #[error("invalid service data: {0}")]
    InvalidData(String),
}
