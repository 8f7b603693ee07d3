//! App trait and runner
//!
//! An app is a long-lived automation reacting to state changes and named
//! events. Every app splits its logic in two: `reconcile()` computes the
//! correct posture from current state at startup, and the event handlers
//! keep it current afterwards. A restart therefore converges to the same
//! outcome as having been running all along, minus any timers that were
//! mid-flight.

use std::sync::Arc;

use async_trait::async_trait;
use casa_core::events::StateChangedData;
use casa_core::Event;
use casa_host::SharedHost;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A long-lived automation
///
/// Handlers take `Arc<Self>` so apps can hand themselves to timers.
#[async_trait]
pub trait App: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Converge to the correct posture from current state, run at startup
    async fn reconcile(self: Arc<Self>) {}

    /// React to an entity state transition
    async fn on_state_change(self: Arc<Self>, change: &StateChangedData) {
        let _ = change;
    }

    /// Event types this app wants delivered to [`App::on_event`]
    fn event_types(&self) -> &'static [&'static str] {
        &[]
    }

    /// React to a named event
    async fn on_event(self: Arc<Self>, event: &Event<Value>) {
        let _ = event;
    }
}

/// Runs apps as tasks over a host's subscriptions
///
/// Each app gets one task that first reconciles, then processes its state
/// changes and events sequentially. Dropping the runner leaves the tasks
/// running; call [`AppRunner::shutdown`] to abort them.
pub struct AppRunner {
    host: SharedHost,
    tasks: Vec<JoinHandle<()>>,
}

impl AppRunner {
    pub fn new(host: SharedHost) -> Self {
        Self {
            host,
            tasks: Vec::new(),
        }
    }

    /// Start an app
    pub fn spawn(&mut self, app: Arc<dyn App>) {
        info!(app = app.name(), "starting app");

        let mut states = self.host.subscribe_states();

        // Funnel all subscribed event types into one queue so the app
        // still processes everything sequentially.
        let (event_tx, mut events) = mpsc::channel::<Event<Value>>(64);
        for event_type in app.event_types() {
            let mut rx = self.host.subscribe_event(event_type);
            let tx = event_tx.clone();
            self.tasks.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "event subscription lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }
        drop(event_tx);

        self.tasks.push(tokio::spawn(async move {
            app.clone().reconcile().await;

            loop {
                tokio::select! {
                    change = states.recv() => match change {
                        Ok(change) => app.clone().on_state_change(&change).await,
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(app = app.name(), missed, "state subscription lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    event = events.recv() => match event {
                        Some(event) => app.clone().on_event(&event).await,
                        // No event subscriptions, or forwarders gone
                        None => {
                            while let Ok(change) = states.recv().await {
                                app.clone().on_state_change(&change).await;
                            }
                            break;
                        }
                    },
                }
            }
        }));
    }

    /// Abort every app task
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Whether the sun entity reports being below the horizon
pub(crate) fn sun_is_down(host: &SharedHost, sun_entity: &str) -> bool {
    host.is_state(sun_entity, "below_horizon")
}

/// Local wall-clock time for notification texts, e.g. "6:42 PM"
pub(crate) fn clock_time() -> String {
    chrono::Local::now().format("%-I:%M %p").to_string()
}

/// An entity's friendly name, falling back to the entity id
pub(crate) fn friendly_name(host: &SharedHost, entity_id: &str) -> String {
    host.get_state(entity_id)
        .and_then(|s| s.attribute::<String>("friendly_name"))
        .unwrap_or_else(|| entity_id.to_string())
}

/// Invoke a service, logging instead of propagating failure
pub(crate) async fn try_call(host: &SharedHost, domain: &str, service: &str, data: Value) {
    if let Err(e) = host.call_service(domain, service, data).await {
        warn!(domain, service, error = %e, "service call failed");
    }
}

/// Turn an entity or group on via the generic homeassistant service
pub(crate) async fn turn_on(host: &SharedHost, entity_id: &str) {
    try_call(
        host,
        "homeassistant",
        "turn_on",
        serde_json::json!({"entity_id": entity_id}),
    )
    .await;
}

/// Turn an entity or group off via the generic homeassistant service
pub(crate) async fn turn_off(host: &SharedHost, entity_id: &str) {
    try_call(
        host,
        "homeassistant",
        "turn_off",
        serde_json::json!({"entity_id": entity_id}),
    )
    .await;
}

/// Ask a phone's companion app to refresh its location
pub(crate) async fn request_location_update(host: &SharedHost, phone_service: &str) {
    try_call(
        host,
        "notify",
        phone_service,
        serde_json::json!({"message": "request_location_update"}),
    )
    .await;
}
