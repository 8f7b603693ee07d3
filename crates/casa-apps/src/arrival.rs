//! Arrival notifications
//!
//! Tells one person when another arrives home, but not when they arrived
//! together. "Together" means within a configurable window: if the
//! recipient has been home longer than that, notify immediately; if the
//! recipient is away, wait out the window first, and cancel silently if
//! they show up in the meantime.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casa_config::{ArrivalConfig, HouseConfig, PersonConfig};
use casa_core::events::StateChangedData;
use casa_host::{run_in, SharedHost, TimerSlot};
use casa_notify::{NotificationRouter, NotifyRequest};
use serde_json::json;
use tracing::info;

use crate::app::{clock_time, App};

pub struct ArrivalNotifier {
    host: SharedHost,
    router: Arc<NotificationRouter>,
    watch: PersonConfig,
    recipient: PersonConfig,
    together_window: Duration,
    pending: TimerSlot,
}

impl ArrivalNotifier {
    /// Build from the arrival pairing; `None` when the config has no
    /// pairing or names an unknown person
    pub fn new(
        host: SharedHost,
        router: Arc<NotificationRouter>,
        config: &HouseConfig,
    ) -> Option<Self> {
        let ArrivalConfig { watch, notify } = config.arrival.as_ref()?;
        let find = |name: &str| {
            config
                .notify
                .people
                .iter()
                .find(|p| p.name == name)
                .cloned()
        };
        Some(Self {
            host,
            router,
            watch: find(watch)?,
            recipient: find(notify)?,
            together_window: Duration::from_secs(config.timing.arrival_together_secs),
            pending: TimerSlot::new(),
        })
    }

    async fn watched_person_arrived(self: Arc<Self>) {
        if let Some(state) = self.host.get_state(&self.recipient.entity_id) {
            if state.state == "home" {
                if state.seconds_since_change() >= self.together_window.as_secs() as i64 {
                    // Recipient was already settled in; tell them now
                    self.announce().await;
                } else {
                    info!(
                        watch = %self.watch.name,
                        recipient = %self.recipient.name,
                        "arrived together, skipping notification"
                    );
                }
                return;
            }
        }

        // Recipient away; give them the window to show up
        let app = self.clone();
        self.pending
            .arm(run_in(self.together_window, move || app.window_expired()));
        info!(
            watch = %self.watch.name,
            wait_secs = self.together_window.as_secs(),
            "arrived, waiting for the other before notifying"
        );
    }

    /// The together-window ran out without the recipient arriving
    pub async fn window_expired(self: Arc<Self>) {
        self.announce().await;
    }

    async fn announce(&self) {
        let message = format!(
            "{} {} is now at home",
            clock_time(),
            capitalize(&self.watch.name)
        );
        let request = NotifyRequest::new([self.recipient.name.as_str()], message)
            .title("Arrival / Departure")
            .data(json!({"tag": "house_arrived_home"}));
        let _ = self.router.send_request(&request).await;
        info!(watch = %self.watch.name, recipient = %self.recipient.name, "arrival notified");
    }

    #[cfg(test)]
    fn waiting(&self) -> bool {
        self.pending.is_armed()
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl App for ArrivalNotifier {
    fn name(&self) -> &'static str {
        "arrival_notifier"
    }

    async fn on_state_change(self: Arc<Self>, change: &StateChangedData) {
        if !change.value_changed() || change.new_value() != Some("home") {
            return;
        }

        if change.entity_id == self.recipient.entity_id.as_str() {
            // Recipient made it home; any pending announcement is moot
            self.pending.cancel();
            return;
        }
        if change.entity_id == self.watch.entity_id.as_str() {
            self.watched_person_arrived().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casa_config::{ChannelConfig, ChannelKind};
    use casa_host::testing::TestHub;

    fn config() -> HouseConfig {
        let mut config = HouseConfig::default();
        config.notify.people = vec![
            PersonConfig {
                name: "javier".to_string(),
                entity_id: "person.javier".to_string(),
                phone_service: "mobile_app_javier_phone".to_string(),
                default_channel: Some("javier_phone".to_string()),
                tracker: None,
                geocoded: None,
            },
            PersonConfig {
                name: "andy".to_string(),
                entity_id: "person.andy".to_string(),
                phone_service: "mobile_app_andy_phone".to_string(),
                default_channel: None,
                tracker: None,
                geocoded: None,
            },
        ];
        config.notify.channels = vec![ChannelConfig {
            id: "javier_phone".to_string(),
            kind: ChannelKind::Push,
            service: Some("mobile_app_javier_phone".to_string()),
            media_player: None,
            owner: Some("javier".to_string()),
            reachable_when: None,
        }];
        config.arrival = Some(ArrivalConfig {
            watch: "andy".to_string(),
            notify: "javier".to_string(),
        });
        config
    }

    fn app(hub: &Arc<TestHub>, config: &HouseConfig) -> Arc<ArrivalNotifier> {
        let router = Arc::new(NotificationRouter::new(hub.clone(), config.notify.clone()));
        Arc::new(ArrivalNotifier::new(hub.clone(), router, config).unwrap())
    }

    fn arrives(hub: &TestHub, entity_id: &str) -> StateChangedData {
        let old = hub.set_state(entity_id, "not_home");
        let new = hub.set_state(entity_id, "home");
        StateChangedData {
            entity_id: entity_id.parse().unwrap(),
            old_state: Some(old),
            new_state: Some(new),
        }
    }

    #[tokio::test]
    async fn missing_pairing_disables_the_app() {
        let hub = Arc::new(TestHub::new());
        let mut config = config();
        config.arrival = None;
        let router = Arc::new(NotificationRouter::new(hub.clone(), config.notify.clone()));
        assert!(ArrivalNotifier::new(hub.clone(), router, &config).is_none());
    }

    #[tokio::test]
    async fn arrivals_within_the_window_count_as_together() {
        let hub = Arc::new(TestHub::new());
        // Recipient just got home, well inside the window
        hub.set_state("person.javier", "home");
        let app = app(&hub, &config());

        let change = arrives(&hub, "person.andy");
        app.clone().on_state_change(&change).await;

        assert!(hub.calls().is_empty());
        assert!(!app.waiting());
    }

    #[tokio::test]
    async fn settled_recipient_is_notified_immediately() {
        let hub = Arc::new(TestHub::new());
        hub.set_state("person.javier", "home");

        // A zero window makes any prior arrival count as settled
        let mut config = config();
        config.timing.arrival_together_secs = 0;
        let app = app(&hub, &config);

        let change = arrives(&hub, "person.andy");
        app.clone().on_state_change(&change).await;

        let calls = hub.calls_to("notify.mobile_app_javier_phone");
        assert_eq!(calls.len(), 1);
        let message: String = calls[0].get("message").unwrap();
        assert!(message.ends_with("Andy is now at home"));
        assert_eq!(calls[0].service_data["data"]["tag"], "house_arrived_home");
    }

    #[tokio::test]
    async fn absent_recipient_is_notified_after_the_window() {
        let hub = Arc::new(TestHub::new());
        hub.set_state("person.javier", "not_home");
        let app = app(&hub, &config());

        let change = arrives(&hub, "person.andy");
        app.clone().on_state_change(&change).await;

        assert!(app.waiting());
        assert!(hub.calls().is_empty());

        app.clone().window_expired().await;
        assert_eq!(hub.calls_to("notify.mobile_app_javier_phone").len(), 1);
    }

    #[tokio::test]
    async fn recipient_arriving_cancels_the_pending_notification() {
        let hub = Arc::new(TestHub::new());
        hub.set_state("person.javier", "not_home");
        let app = app(&hub, &config());

        let andy = arrives(&hub, "person.andy");
        app.clone().on_state_change(&andy).await;
        assert!(app.waiting());

        let javier = arrives(&hub, "person.javier");
        app.clone().on_state_change(&javier).await;
        assert!(!app.waiting());
    }
}
