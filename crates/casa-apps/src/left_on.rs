//! Things-left-on watcher
//!
//! When the house empties, turn off the outside lights right away, then
//! give the slower automations a couple of minutes before sweeping the
//! all-devices group for anything still on. Whatever remains becomes one
//! actionable notification with a "turn everything off" button.
//!
//! Vacation mode changes the rules: lights are supposed to cycle for fake
//! presence, so the sweep runs on a long interval instead and only flags
//! devices that stayed on across a whole cycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casa_config::HouseConfig;
use casa_core::events::{NotificationActionData, StateChangedData, NOTIFICATION_ACTION};
use casa_core::Event;
use casa_host::{run_every, run_in, SharedHost, TimerSlot};
use casa_notify::{NotificationRouter, NotifyRequest};
use serde_json::{json, Value};
use tracing::info;

use crate::app::{clock_time, friendly_name, turn_off, App};

const ACTION_TURN_EVERYTHING_OFF: &str = "turn_everything_off";

pub struct LeftOnNotifier {
    host: SharedHost,
    router: Arc<NotificationRouter>,
    house_occupied: String,
    vacation_mode: String,
    outside_lights: String,
    all_devices: String,
    check_delay: Duration,
    vacation_interval: Duration,
    check_timer: TimerSlot,
    vacation_timer: TimerSlot,
}

impl LeftOnNotifier {
    pub fn new(host: SharedHost, router: Arc<NotificationRouter>, config: &HouseConfig) -> Self {
        Self {
            host,
            router,
            house_occupied: config.entities.house_occupied.clone(),
            vacation_mode: config.entities.vacation_mode.clone(),
            outside_lights: config.entities.outside_lights.clone(),
            all_devices: config.entities.all_devices.clone(),
            check_delay: Duration::from_secs(config.timing.left_on_wait_secs),
            vacation_interval: Duration::from_secs(config.timing.vacation_check_interval_secs),
            check_timer: TimerSlot::new(),
            vacation_timer: TimerSlot::new(),
        }
    }

    async fn house_emptied(self: Arc<Self>) {
        if self.host.is_state(&self.vacation_mode, "on") {
            info!("vacation mode, periodic sweep covers left-on devices");
            return;
        }

        if self.host.is_state(&self.outside_lights, "on") {
            turn_off(&self.host, &self.outside_lights).await;
            info!("turned off outside lights");
        }

        let app = self.clone();
        self.check_timer
            .arm(run_in(self.check_delay, move || app.check_and_notify()));
        info!(
            delay_secs = self.check_delay.as_secs(),
            "will check for things left on"
        );
    }

    /// The post-departure delay elapsed; sweep and notify if needed
    pub async fn check_and_notify(self: Arc<Self>) {
        if self.host.is_state(&self.house_occupied, "on") {
            info!("house occupied again, skipping left-on check");
            return;
        }

        let still_on = self.devices_still_on();
        if still_on.is_empty() {
            info!("everything is off");
            return;
        }

        let names: Vec<String> = still_on
            .iter()
            .map(|e| friendly_name(&self.host, e))
            .collect();
        let message = format!(
            "At {} house is empty, and these are on: {}",
            clock_time(),
            names.join(", ")
        );
        let request = NotifyRequest::new(["everyone"], message)
            .title("Something is turned ON")
            .data(json!({
                "tag": "house_turned_on",
                "clickAction": "/lovelace/main",
                "actions": [
                    {"action": ACTION_TURN_EVERYTHING_OFF, "title": "Turn everything off"}
                ],
            }))
            .high_priority();
        let _ = self.router.send_request(&request).await;
        info!(devices = still_on.len(), "left-on notification sent");
    }

    /// One tick of the long vacation-mode sweep
    pub async fn vacation_sweep(self: Arc<Self>) {
        if !self.host.is_state(&self.vacation_mode, "on") {
            return;
        }
        if self.host.is_state(&self.house_occupied, "on") {
            return;
        }

        let still_on = self.devices_still_on();
        if still_on.is_empty() {
            return;
        }

        let names: Vec<String> = still_on
            .iter()
            .map(|e| friendly_name(&self.host, e))
            .collect();
        let message = format!(
            "Vacation mode: these have been on for a while: {}",
            names.join(", ")
        );
        let request = NotifyRequest::new(["everyone"], message)
            .title("Vacation Alert")
            .data(json!({
                "tag": "vacation_left_on",
                "actions": [
                    {"action": ACTION_TURN_EVERYTHING_OFF, "title": "Turn everything off"}
                ],
            }));
        let _ = self.router.send_request(&request).await;
        info!(devices = still_on.len(), "vacation left-on alert sent");
    }

    fn start_vacation_sweep(self: Arc<Self>) {
        let app = self.clone();
        self.vacation_timer
            .arm(run_every(self.vacation_interval, move || {
                app.clone().vacation_sweep()
            }));
        info!(
            interval_secs = self.vacation_interval.as_secs(),
            "vacation sweep started"
        );
    }

    /// Members of the all-devices group that are not off
    fn devices_still_on(&self) -> Vec<String> {
        let Some(group) = self.host.get_state(&self.all_devices) else {
            return Vec::new();
        };
        let members: Vec<String> = group.attribute("entity_id").unwrap_or_default();

        members
            .into_iter()
            .filter(|entity_id| {
                self.host
                    .get_state(entity_id)
                    .map(|s| !matches!(s.state.as_str(), "off" | "unknown" | "unavailable"))
                    .unwrap_or(false)
            })
            .collect()
    }

    #[cfg(test)]
    fn check_pending(&self) -> bool {
        self.check_timer.is_armed()
    }

    #[cfg(test)]
    fn vacation_sweep_running(&self) -> bool {
        self.vacation_timer.is_armed()
    }
}

#[async_trait]
impl App for LeftOnNotifier {
    fn name(&self) -> &'static str {
        "left_on_notifier"
    }

    async fn reconcile(self: Arc<Self>) {
        // A restart mid-vacation must resume the periodic sweep
        if self.host.is_state(&self.vacation_mode, "on") {
            self.start_vacation_sweep();
        }
    }

    async fn on_state_change(self: Arc<Self>, change: &StateChangedData) {
        if !change.value_changed() {
            return;
        }

        if change.entity_id == self.house_occupied.as_str() {
            if change.new_value() == Some("off") {
                self.house_emptied().await;
            }
            return;
        }

        if change.entity_id == self.vacation_mode.as_str() {
            match change.new_value() {
                Some("on") => self.start_vacation_sweep(),
                Some("off") => {
                    self.vacation_timer.cancel();
                    info!("vacation sweep stopped");
                }
                _ => {}
            }
        }
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[NOTIFICATION_ACTION]
    }

    async fn on_event(self: Arc<Self>, event: &Event<Value>) {
        let Ok(action) = serde_json::from_value::<NotificationActionData>(event.data.clone())
        else {
            return;
        };
        if action.action == ACTION_TURN_EVERYTHING_OFF {
            turn_off(&self.host, &self.all_devices).await;
            info!("turned everything off via notification action");
        }
    }
}
