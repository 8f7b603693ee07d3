//! Host interface and in-process hub
//!
//! The automation host owns state storage, event delivery, and device
//! communication. This crate exposes it through a deliberately narrow
//! typed interface ([`HostApi`]) so routing and app logic are testable
//! without a live host, plus an in-process implementation ([`LocalHub`])
//! built from an event bus, a state store, and a service registry.

mod api;
mod bus;
mod error;
mod hub;
mod scheduler;
mod services;
mod store;

pub mod testing;

pub use api::HostApi;
pub use bus::EventBus;
pub use error::{HostError, HostResult};
pub use hub::LocalHub;
pub use scheduler::{run_every, run_in, TimerHandle, TimerSlot};
pub use services::{ServiceHandler, ServiceRegistry};
pub use store::StateStore;

use std::sync::Arc;

/// Thread-safe handle to a host implementation
pub type SharedHost = Arc<dyn HostApi>;
