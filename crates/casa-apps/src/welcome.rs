//! Welcome-home behavior
//!
//! Reacts to the house becoming occupied (lights after sunset, a status
//! notification) and to entry points opening (a spoken welcome). The TTS
//! is keyed to the door rather than to occupancy because presence
//! detection can fire while the person is still parking; the door proves
//! they are physically walking in. A short delay gives them time to get
//! inside before the speaker talks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casa_config::HouseConfig;
use casa_core::events::StateChangedData;
use casa_host::{run_in, SharedHost, TimerSlot};
use casa_notify::NotificationRouter;
use tracing::info;

use crate::app::{clock_time, sun_is_down, turn_on, App};

pub struct WelcomeHome {
    host: SharedHost,
    router: Arc<NotificationRouter>,
    house_occupied: String,
    sun: String,
    living_room_lights: String,
    outside_lights: String,
    entry_points: Vec<String>,
    recent_window_secs: i64,
    tts_delay: Duration,
    welcome_timer: TimerSlot,
}

impl WelcomeHome {
    pub fn new(host: SharedHost, router: Arc<NotificationRouter>, config: &HouseConfig) -> Self {
        Self {
            host,
            router,
            house_occupied: config.entities.house_occupied.clone(),
            sun: config.entities.sun.clone(),
            living_room_lights: config.entities.living_room_lights.clone(),
            outside_lights: config.entities.outside_lights.clone(),
            entry_points: config
                .entities
                .entry_points
                .iter()
                .map(|e| e.entity_id.clone())
                .collect(),
            recent_window_secs: config.timing.welcome_recent_secs as i64,
            tts_delay: Duration::from_secs(config.timing.welcome_tts_delay_secs),
            welcome_timer: TimerSlot::new(),
        }
    }

    async fn occupancy_changed(&self, occupied: bool) {
        let time = clock_time();
        if occupied {
            info!("house became occupied");
            if sun_is_down(&self.host, &self.sun) {
                turn_on(&self.host, &self.living_room_lights).await;
                turn_on(&self.host, &self.outside_lights).await;
                info!("after sunset, turned on arrival lights");
            }
            let _ = self
                .router
                .send(
                    &["everyone"],
                    &format!("House is now occupied at {}", time),
                    Some("House Status"),
                )
                .await;
        } else {
            info!("house became unoccupied");
            let _ = self
                .router
                .send(
                    &["everyone"],
                    &format!("House is now unoccupied at {}", time),
                    Some("House Status"),
                )
                .await;
        }
    }

    /// The post-door-open delay elapsed; decide what, if anything, to say
    pub async fn welcome_check(self: Arc<Self>) {
        let Some(occupied) = self.host.get_state(&self.house_occupied) else {
            return;
        };

        if !occupied.is_on() {
            // Presence detection hasn't caught up yet; softer greeting
            self.router
                .tts_first_floor("Bienvenidos a casa, detectando presencia")
                .await;
            info!("welcome TTS: house not yet occupied");
            return;
        }

        let seconds_ago = occupied.seconds_since_change();
        if seconds_ago < self.recent_window_secs {
            self.router.tts_first_floor("Bienvenidos a casa").await;
            info!(seconds_ago, "welcome TTS: first arrival");
        } else {
            info!(seconds_ago, "house long occupied, skipping welcome TTS");
        }
    }
}

#[async_trait]
impl App for WelcomeHome {
    fn name(&self) -> &'static str {
        "welcome_home"
    }

    async fn on_state_change(self: Arc<Self>, change: &StateChangedData) {
        if !change.value_changed() {
            return;
        }

        if change.entity_id == self.house_occupied.as_str() {
            match change.new_value() {
                Some("on") => self.occupancy_changed(true).await,
                Some("off") => self.occupancy_changed(false).await,
                _ => {}
            }
            return;
        }

        let opened = self
            .entry_points
            .iter()
            .any(|e| change.entity_id == e.as_str());
        if opened && change.new_value() == Some("on") {
            info!(entity = %change.entity_id, "entry point opened");
            let app = self.clone();
            self.welcome_timer
                .arm(run_in(self.tts_delay, move || app.welcome_check()));
        }
    }
}
