//! Low battery sweep
//!
//! Periodically scans every battery sensor and reports the ones below the
//! threshold in a single grouped notification, lowest first. Sensors
//! without a numeric reading (unavailable, unknown, health strings) are
//! skipped. Also runs once shortly after startup, delayed so entities
//! have a chance to load.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casa_config::HouseConfig;
use casa_host::{run_every, run_in, SharedHost, TimerSlot};
use casa_notify::NotificationRouter;
use tracing::info;

use crate::app::App;

pub struct LowBatteryNotifier {
    host: SharedHost,
    router: Arc<NotificationRouter>,
    threshold: f64,
    interval: Duration,
    startup_delay: Duration,
    startup_timer: TimerSlot,
    sweep_timer: TimerSlot,
}

impl LowBatteryNotifier {
    pub fn new(host: SharedHost, router: Arc<NotificationRouter>, config: &HouseConfig) -> Self {
        Self {
            host,
            router,
            threshold: config.battery.threshold,
            interval: Duration::from_secs(config.timing.battery_check_interval_secs),
            startup_delay: Duration::from_secs(config.timing.battery_startup_delay_secs),
            startup_timer: TimerSlot::new(),
            sweep_timer: TimerSlot::new(),
        }
    }

    /// Battery sensors currently below the threshold, lowest first
    fn low_batteries(&self) -> Vec<(String, f64)> {
        let mut low: Vec<(String, f64)> = self
            .host
            .all_states()
            .into_iter()
            .filter(|s| {
                s.entity_id.domain() == "sensor" && s.entity_id.object_id().contains("battery")
            })
            .filter_map(|s| {
                let level = s.numeric_value()?;
                if level >= self.threshold {
                    return None;
                }
                let name = s
                    .attribute::<String>("friendly_name")
                    .unwrap_or_else(|| s.entity_id.to_string());
                Some((name, level))
            })
            .collect();

        low.sort_by(|a, b| a.1.total_cmp(&b.1));
        low
    }

    /// One pass over all battery sensors
    pub async fn sweep(self: Arc<Self>) {
        let low = self.low_batteries();
        if low.is_empty() {
            info!("all batteries OK");
            return;
        }

        let message = low
            .iter()
            .map(|(name, level)| format!("• {}: {:.0}%", name, level))
            .collect::<Vec<_>>()
            .join("\n");
        let title = format!("Low Battery Alert ({} devices)", low.len());

        let _ = self
            .router
            .send(&["everyone"], &message, Some(&title))
            .await;
        info!(devices = low.len(), "low battery alert sent");
    }
}

#[async_trait]
impl App for LowBatteryNotifier {
    fn name(&self) -> &'static str {
        "low_battery_notifier"
    }

    async fn reconcile(self: Arc<Self>) {
        let app = self.clone();
        self.startup_timer
            .arm(run_in(self.startup_delay, move || app.sweep()));

        let app = self.clone();
        self.sweep_timer
            .arm(run_every(self.interval, move || app.clone().sweep()));

        info!(
            interval_secs = self.interval.as_secs(),
            "battery sweep scheduled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casa_config::{ChannelConfig, ChannelKind, PersonConfig};
    use casa_host::testing::TestHub;
    use serde_json::json;
    use std::collections::HashMap;

    fn config() -> HouseConfig {
        let mut config = HouseConfig::default();
        config.notify.people = vec![PersonConfig {
            name: "javier".to_string(),
            entity_id: "person.javier".to_string(),
            phone_service: "mobile_app_javier_phone".to_string(),
            default_channel: None,
            tracker: None,
            geocoded: None,
        }];
        config.notify.channels = vec![ChannelConfig {
            id: "javier_phone".to_string(),
            kind: ChannelKind::Push,
            service: Some("mobile_app_javier_phone".to_string()),
            media_player: None,
            owner: Some("javier".to_string()),
            reachable_when: None,
        }];
        config
    }

    fn app(hub: &Arc<TestHub>) -> Arc<LowBatteryNotifier> {
        let config = config();
        let router = Arc::new(NotificationRouter::new(hub.clone(), config.notify.clone()));
        Arc::new(LowBatteryNotifier::new(hub.clone(), router, &config))
    }

    fn named(hub: &TestHub, entity: &str, value: &str, name: &str) {
        let mut attrs = HashMap::new();
        attrs.insert("friendly_name".to_string(), json!(name));
        hub.set_state_with(entity, value, attrs);
    }

    #[tokio::test]
    async fn sweep_groups_low_batteries_lowest_first() {
        let hub = Arc::new(TestHub::new());
        named(&hub, "sensor.front_door_battery", "12", "Front Door");
        named(&hub, "sensor.kitchen_button_battery", "5", "Kitchen Button");
        named(&hub, "sensor.bedroom_battery", "87", "Bedroom");
        // Not numeric, skipped
        hub.set_state("sensor.gate_battery", "unavailable");
        // Not a battery sensor
        hub.set_state("sensor.kitchen_temperature", "3");
        let app = app(&hub);

        app.clone().sweep().await;

        let calls = hub.calls_to("notify.mobile_app_javier_phone");
        assert_eq!(calls.len(), 1);
        let message: String = calls[0].get("message").unwrap();
        assert_eq!(message, "• Kitchen Button: 5%\n• Front Door: 12%");
        assert_eq!(
            calls[0].get::<String>("title").as_deref(),
            Some("Low Battery Alert (2 devices)")
        );
    }

    #[tokio::test]
    async fn healthy_batteries_stay_quiet() {
        let hub = Arc::new(TestHub::new());
        named(&hub, "sensor.front_door_battery", "80", "Front Door");
        let app = app(&hub);

        app.clone().sweep().await;
        hub.assert_call_count(0);
    }

    #[tokio::test]
    async fn reconcile_schedules_both_sweeps() {
        let hub = Arc::new(TestHub::new());
        let app = app(&hub);

        app.clone().reconcile().await;
        assert!(app.startup_timer.is_armed());
        assert!(app.sweep_timer.is_armed());
    }
}
