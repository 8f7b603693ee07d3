//! Vacation mode suggestion and auto-disable
//!
//! Presence zones only say "not_home", which could mean the grocery
//! store. This app decides "actually away": the geocoded location sensor
//! reporting a foreign country, or (when no country data is available)
//! GPS distance from the home zone beyond a threshold. When every tracked
//! person is away by that measure, it offers to enable vacation mode via
//! an actionable notification, at most once per trip. The house becoming
//! occupied again turns vacation mode off and re-arms the offer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use casa_config::{HouseConfig, PersonConfig};
use casa_core::events::{NotificationActionData, StateChangedData, NOTIFICATION_ACTION};
use casa_core::{Event, State};
use casa_host::SharedHost;
use casa_notify::{NotificationRouter, NotifyRequest};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::app::{try_call, App};

const ACTION_ENABLE_VACATION: &str = "ENABLE_VACATION_MODE";

/// Great-circle distance between two coordinates, in kilometers
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

fn coords(state: &State) -> Option<(f64, f64)> {
    Some((state.attribute("latitude")?, state.attribute("longitude")?))
}

pub struct VacationMode {
    host: SharedHost,
    router: Arc<NotificationRouter>,
    people: Vec<PersonConfig>,
    vacation_mode: String,
    house_occupied: String,
    home_zone: String,
    home_country: String,
    far_km: f64,
    // Set once the offer has been sent, reset when someone comes home
    offer_sent: AtomicBool,
}

impl VacationMode {
    pub fn new(host: SharedHost, router: Arc<NotificationRouter>, config: &HouseConfig) -> Self {
        Self {
            host,
            router,
            people: config.notify.people.clone(),
            vacation_mode: config.entities.vacation_mode.clone(),
            house_occupied: config.entities.house_occupied.clone(),
            home_zone: config.entities.home_zone.clone(),
            home_country: config.location.home_country.clone(),
            far_km: config.location.far_from_home_km,
            offer_sent: AtomicBool::new(false),
        }
    }

    /// Whether a person is demonstrably far from home
    ///
    /// Country beats distance: the geocoded sensor updating to a foreign
    /// country is conclusive even before GPS coordinates settle.
    fn is_person_far(&self, person: &PersonConfig) -> bool {
        if let Some(geocoded) = person
            .geocoded
            .as_deref()
            .and_then(|e| self.host.get_state(e))
        {
            // iOS and Android spell the attribute differently
            let country: Option<String> = geocoded
                .attribute("ISO Country Code")
                .or_else(|| geocoded.attribute("iso_country_code"));
            if let Some(country) = country {
                let abroad = country != self.home_country;
                debug!(person = %person.name, %country, abroad, "country check");
                return abroad;
            }
        }

        let Some(home) = self.host.get_state(&self.home_zone).and_then(|s| coords(&s)) else {
            return false;
        };
        let Some(position) = person
            .tracker
            .as_deref()
            .and_then(|e| self.host.get_state(e))
            .and_then(|s| coords(&s))
        else {
            return false;
        };

        let distance = haversine_km(home.0, home.1, position.0, position.1);
        let far = distance > self.far_km;
        debug!(person = %person.name, distance_km = distance, far, "distance check");
        far
    }

    /// Re-evaluate whether to offer vacation mode
    pub async fn check_vacation(self: Arc<Self>) {
        if self.host.is_state(&self.vacation_mode, "on") {
            return;
        }
        if self.offer_sent.load(Ordering::SeqCst) {
            return;
        }
        if self.people.is_empty() || !self.people.iter().all(|p| self.is_person_far(p)) {
            return;
        }

        self.offer_sent.store(true, Ordering::SeqCst);
        let request = NotifyRequest::new(
            ["everyone"],
            "Detectamos que están lejos de casa. ¿Activar modo vacaciones?",
        )
        .title("Modo Vacaciones")
        .data(json!({
            "actions": [
                {"action": ACTION_ENABLE_VACATION, "title": "Activar"}
            ],
        }));
        let _ = self.router.send_request(&request).await;
        info!("vacation mode offer sent");
    }

    async fn house_occupied_again(&self) {
        // Next trip gets a fresh offer
        self.offer_sent.store(false, Ordering::SeqCst);

        if self.host.is_state(&self.vacation_mode, "on") {
            try_call(
                &self.host,
                "input_boolean",
                "turn_off",
                json!({"entity_id": self.vacation_mode}),
            )
            .await;
            info!("vacation mode auto-disabled, house occupied");

            let _ = self
                .router
                .send(
                    &["everyone"],
                    "Modo vacaciones desactivado automáticamente - bienvenidos a casa",
                    Some("Modo Vacaciones"),
                )
                .await;
        }
    }

    #[cfg(test)]
    fn offer_was_sent(&self) -> bool {
        self.offer_sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl App for VacationMode {
    fn name(&self) -> &'static str {
        "vacation_mode"
    }

    async fn reconcile(self: Arc<Self>) {
        // The trip may have started while we weren't running
        self.check_vacation().await;
    }

    async fn on_state_change(self: Arc<Self>, change: &StateChangedData) {
        if change.entity_id == self.house_occupied.as_str() {
            if change.value_changed() && change.new_value() == Some("on") {
                self.house_occupied_again().await;
            }
            return;
        }

        // Geocoded sensors update on attribute changes too, so no
        // value_changed gate here
        let watched = self
            .people
            .iter()
            .any(|p| matches!(&p.geocoded, Some(e) if change.entity_id == e.as_str()));
        if watched {
            self.check_vacation().await;
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
        if action.action != ACTION_ENABLE_VACATION {
            return;
        }

        try_call(
            &self.host,
            "input_boolean",
            "turn_on",
            json!({"entity_id": self.vacation_mode}),
        )
        .await;
        info!("vacation mode enabled via notification action");

        let _ = self
            .router
            .send(
                &["everyone"],
                "Modo vacaciones activado",
                Some("Modo Vacaciones"),
            )
            .await;
    }
}
