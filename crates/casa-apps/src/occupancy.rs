//! House occupancy tracking
//!
//! Keeps the `house_occupied` boolean in step with person presence. An
//! arrival turns it on immediately; the house only counts as empty after
//! everyone has been away for a buffer period, so presence detection
//! glitches don't flap the flag. Guest mode pins it on for visitors
//! without tracked presence.
//!
//! People often travel together, so every arrival or departure also asks
//! the other phones for a location update to converge presence faster.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casa_config::{HouseConfig, PersonConfig};
use casa_core::events::StateChangedData;
use casa_host::{run_in, SharedHost, TimerSlot};
use tracing::info;

use crate::app::{request_location_update, try_call, App};

pub struct HouseOccupancy {
    host: SharedHost,
    people: Vec<PersonConfig>,
    house_occupied: String,
    guest_mode: String,
    departure_delay: Duration,
    departure_timer: TimerSlot,
}

impl HouseOccupancy {
    pub fn new(host: SharedHost, config: &HouseConfig) -> Self {
        Self {
            host,
            people: config.notify.people.clone(),
            house_occupied: config.entities.house_occupied.clone(),
            guest_mode: config.entities.guest_mode.clone(),
            departure_delay: Duration::from_secs(config.timing.departure_delay_secs),
            departure_timer: TimerSlot::new(),
        }
    }

    fn anyone_home(&self) -> bool {
        self.people
            .iter()
            .any(|p| self.host.is_state(&p.entity_id, "home"))
    }

    fn guest_mode_on(&self) -> bool {
        self.host.is_state(&self.guest_mode, "on")
    }

    async fn ping_other_phones(&self, arrived_or_left: &str) {
        for person in self.people.iter().filter(|p| p.name != arrived_or_left) {
            request_location_update(&self.host, &person.phone_service).await;
            info!(phone = %person.phone_service, "requested location update");
        }
    }

    async fn person_arrived(self: Arc<Self>, name: &str) {
        self.departure_timer.cancel();
        self.ping_other_phones(name).await;

        if self.host.is_state(&self.house_occupied, "on") {
            info!(person = name, "arrived, house already occupied");
            return;
        }
        try_call(
            &self.host,
            "input_boolean",
            "turn_on",
            serde_json::json!({"entity_id": self.house_occupied}),
        )
        .await;
        info!(person = name, "arrived, house occupied ON");
    }

    async fn person_left(self: Arc<Self>, name: &str) {
        self.ping_other_phones(name).await;

        if self.anyone_home() {
            info!(person = name, "left, but someone still home");
            return;
        }
        if self.guest_mode_on() {
            info!(person = name, "left, but guest mode ON");
            return;
        }
        self.clone().arm_departure();
        info!(
            person = name,
            delay_secs = self.departure_delay.as_secs(),
            "everyone away, departure timer started"
        );
    }

    fn arm_departure(self: Arc<Self>) {
        let app = self.clone();
        self.departure_timer
            .arm(run_in(self.departure_delay, move || {
                app.departure_expired()
            }));
    }

    /// The departure buffer ran out; re-check before declaring the house empty
    pub async fn departure_expired(self: Arc<Self>) {
        if self.anyone_home() {
            info!("departure timer expired but someone returned");
            return;
        }
        if self.guest_mode_on() {
            info!("departure timer expired but guest mode ON");
            return;
        }
        if self.host.is_state(&self.house_occupied, "on") {
            try_call(
                &self.host,
                "input_boolean",
                "turn_off",
                serde_json::json!({"entity_id": self.house_occupied}),
            )
            .await;
            info!("house occupied OFF");
        }
    }

    #[cfg(test)]
    fn departure_pending(&self) -> bool {
        self.departure_timer.is_armed()
    }
}

#[async_trait]
impl App for HouseOccupancy {
    fn name(&self) -> &'static str {
        "house_occupancy"
    }

    async fn reconcile(self: Arc<Self>) {
        let occupied = self.host.is_state(&self.house_occupied, "on");

        if self.anyone_home() {
            if !occupied {
                try_call(
                    &self.host,
                    "input_boolean",
                    "turn_on",
                    serde_json::json!({"entity_id": self.house_occupied}),
                )
                .await;
                info!("reconcile: someone home, house occupied ON");
            }
        } else if occupied && !self.guest_mode_on() {
            // The in-flight departure timer did not survive a restart
            self.arm_departure();
            info!("reconcile: occupied but nobody home, departure timer started");
        }
    }

    async fn on_state_change(self: Arc<Self>, change: &StateChangedData) {
        if !change.value_changed() {
            return;
        }
        let Some(person) = self
            .people
            .iter()
            .find(|p| change.entity_id == p.entity_id.as_str())
        else {
            return;
        };
        let name = person.name.clone();

        if change.new_value() == Some("home") {
            self.person_arrived(&name).await;
        } else {
            self.person_left(&name).await;
        }
    }
}
