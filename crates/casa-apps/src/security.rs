//! Entry-point monitoring
//!
//! When a door or gate opens while the house is empty, the most likely
//! explanation is an arrival the presence detection hasn't seen yet. The
//! response is therefore staged: ping the phones for fresh locations,
//! light the way if it's dark, and only alert if the house is still
//! unoccupied after a grace period.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casa_config::{EntryPoint, HouseConfig, PersonConfig};
use casa_core::events::StateChangedData;
use casa_host::{run_in, SharedHost, TimerSlot};
use casa_notify::{NotificationRouter, NotifyRequest};
use tracing::info;

use crate::app::{clock_time, request_location_update, sun_is_down, turn_on, App};

pub struct HouseSecurity {
    host: SharedHost,
    router: Arc<NotificationRouter>,
    people: Vec<PersonConfig>,
    house_occupied: String,
    sun: String,
    living_room_lights: String,
    outside_lights: String,
    entry_points: Vec<EntryPoint>,
    alert_delay: Duration,
    alert_timer: TimerSlot,
}

impl HouseSecurity {
    pub fn new(host: SharedHost, router: Arc<NotificationRouter>, config: &HouseConfig) -> Self {
        Self {
            host,
            router,
            people: config.notify.people.clone(),
            house_occupied: config.entities.house_occupied.clone(),
            sun: config.entities.sun.clone(),
            living_room_lights: config.entities.living_room_lights.clone(),
            outside_lights: config.entities.outside_lights.clone(),
            entry_points: config.entities.entry_points.clone(),
            alert_delay: Duration::from_secs(config.timing.entry_alert_secs),
            alert_timer: TimerSlot::new(),
        }
    }

    async fn entry_opened(self: Arc<Self>, entry_name: &str) {
        info!(entry = entry_name, "entry opened while house unoccupied");

        for person in &self.people {
            request_location_update(&self.host, &person.phone_service).await;
        }

        if sun_is_down(&self.host, &self.sun) {
            turn_on(&self.host, &self.living_room_lights).await;
            turn_on(&self.host, &self.outside_lights).await;
            info!("after sunset, turned on lights");
        }

        let app = self.clone();
        let name = entry_name.to_string();
        self.alert_timer
            .arm(run_in(self.alert_delay, move || app.alert_expired(name)));
    }

    /// The grace period ran out; alert if nobody arrived after all
    pub async fn alert_expired(self: Arc<Self>, entry_name: String) {
        if self.host.is_state(&self.house_occupied, "on") {
            info!(entry = %entry_name, "someone arrived, no alert");
            return;
        }

        let message = format!("{} opened at {} but no one arrived!", entry_name, clock_time());
        let request = NotifyRequest::new(["everyone"], message)
            .title("Security Alert")
            .high_priority();
        let _ = self.router.send_request(&request).await;
        info!(entry = %entry_name, "security alert sent");
    }

    #[cfg(test)]
    fn alert_pending(&self) -> bool {
        self.alert_timer.is_armed()
    }
}

#[async_trait]
impl App for HouseSecurity {
    fn name(&self) -> &'static str {
        "house_security"
    }

    async fn on_state_change(self: Arc<Self>, change: &StateChangedData) {
        if !change.value_changed() || change.new_value() != Some("on") {
            return;
        }
        let Some(entry) = self
            .entry_points
            .iter()
            .find(|e| change.entity_id == e.entity_id.as_str())
        else {
            return;
        };
        if self.host.is_state(&self.house_occupied, "on") {
            return;
        }
        let name = entry.name.clone();
        self.entry_opened(&name).await;
    }
}
