//! House automations
//!
//! Each app is a self-contained automation over the host interface: it
//! reconciles its posture from current state at startup, then reacts to
//! state changes and events. Apps never talk to each other directly; they
//! coordinate through entity state (`house_occupied`, `vacation_mode`)
//! like any other part of the house.

mod app;
mod arrival;
mod battery;
mod left_on;
mod occupancy;
mod security;
mod vacation;
mod welcome;

pub use app::{App, AppRunner};
pub use arrival::ArrivalNotifier;
pub use battery::LowBatteryNotifier;
pub use left_on::LeftOnNotifier;
pub use occupancy::HouseOccupancy;
pub use security::HouseSecurity;
pub use vacation::VacationMode;
pub use welcome::WelcomeHome;

use std::sync::Arc;

use casa_config::HouseConfig;
use casa_host::SharedHost;
use casa_notify::NotificationRouter;

/// Build the full set of house apps for a configuration
///
/// The arrival notifier is only included when the config carries an
/// arrival pairing.
pub fn house_apps(
    host: SharedHost,
    router: Arc<NotificationRouter>,
    config: &HouseConfig,
) -> Vec<Arc<dyn App>> {
    let mut apps: Vec<Arc<dyn App>> = vec![
        Arc::new(HouseOccupancy::new(host.clone(), config)),
        Arc::new(WelcomeHome::new(host.clone(), router.clone(), config)),
        Arc::new(HouseSecurity::new(host.clone(), router.clone(), config)),
        Arc::new(LeftOnNotifier::new(host.clone(), router.clone(), config)),
        Arc::new(VacationMode::new(host.clone(), router.clone(), config)),
        Arc::new(LowBatteryNotifier::new(host.clone(), router.clone(), config)),
    ];
    if let Some(arrival) = ArrivalNotifier::new(host, router, config) {
        apps.push(Arc::new(arrival));
    }
    apps
}

#[cfg(test)]
mod tests {
    use super::*;
    use casa_config::ArrivalConfig;
    use casa_host::testing::TestHub;

    #[test]
    fn arrival_app_depends_on_the_pairing() {
        let hub: SharedHost = Arc::new(TestHub::new());
        let mut config = HouseConfig::default();
        let router = Arc::new(NotificationRouter::new(hub.clone(), config.notify.clone()));

        assert_eq!(house_apps(hub.clone(), router.clone(), &config).len(), 6);

        config.notify.people = vec![
            casa_config::PersonConfig {
                name: "javier".to_string(),
                entity_id: "person.javier".to_string(),
                phone_service: "mobile_app_javier_phone".to_string(),
                default_channel: None,
                tracker: None,
                geocoded: None,
            },
            casa_config::PersonConfig {
                name: "andy".to_string(),
                entity_id: "person.andy".to_string(),
                phone_service: "mobile_app_andy_phone".to_string(),
                default_channel: None,
                tracker: None,
                geocoded: None,
            },
        ];
        config.arrival = Some(ArrivalConfig {
            watch: "andy".to_string(),
            notify: "javier".to_string(),
        });
        assert_eq!(house_apps(hub, router, &config).len(), 7);
    }
}
