//! Notification routing
//!
//! Maps symbolic audiences ("home", "everyone", a person, a device) to the
//! concrete delivery channels that should receive a message right now,
//! based on live presence and device state, then fans the message out
//! best-effort over the host's notify and TTS services.
//!
//! Resolution is a pure function of current host state and the static
//! routing table: the same targets resolved twice with no state change in
//! between yield the same channel set.

mod error;
mod request;
mod router;

pub use error::RouterError;
pub use request::{NotifyRequest, Priority};
pub use router::NotificationRouter;
