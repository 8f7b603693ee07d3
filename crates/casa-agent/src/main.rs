//! House automation agent
//!
//! Loads the house configuration, builds the in-process hub, registers
//! local service handlers, and runs the apps until interrupted. Outbound
//! notify and TTS services are logging stand-ins here; an embedder that
//! bridges the hub to a live platform replaces them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use casa_apps::{house_apps, AppRunner};
use casa_config::HouseConfig;
use casa_core::ServiceCall;
use casa_host::{HostApi, LocalHub, SharedHost, StateStore};
use casa_notify::NotificationRouter;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn config_path() -> PathBuf {
    std::env::var_os("CASA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/casa.yaml"))
}

/// Register handlers for every service the apps call
///
/// Turn-on/turn-off write entity state back into the hub so the apps see
/// their own effects; notify and TTS just log what would have been sent.
fn register_local_services(hub: &LocalHub, config: &HouseConfig) {
    let set_value = |states: Arc<StateStore>, value: &'static str| {
        move |call: ServiceCall| {
            let states = states.clone();
            async move {
                for entity_id in call.entity_ids() {
                    let attributes = states
                        .get(&entity_id)
                        .map(|s| s.attributes)
                        .unwrap_or_default();
                    states.set(
                        entity_id.parse().map_err(|e| {
                            casa_host::HostError::InvalidData(format!("{}: {}", entity_id, e))
                        })?,
                        value,
                        attributes,
                        call.context.clone(),
                    );
                }
                Ok(())
            }
        }
    };

    for domain in ["homeassistant", "input_boolean"] {
        hub.services
            .register(domain, "turn_on", set_value(hub.states.clone(), "on"));
        hub.services
            .register(domain, "turn_off", set_value(hub.states.clone(), "off"));
    }

    let notify_services = config
        .notify
        .channels
        .iter()
        .filter_map(|c| c.service.as_deref())
        .chain(config.notify.people.iter().map(|p| p.phone_service.as_str()));

    // A phone may appear both as a channel and as a person's phone_service
    for service in notify_services {
        if hub.services.has_service("notify", service) {
            continue;
        }
        hub.services.register("notify", service, |call| async move {
            info!(
                service = %call.service,
                message = call.get::<String>("message").as_deref().unwrap_or(""),
                title = call.get::<String>("title").as_deref().unwrap_or(""),
                "notify"
            );
            Ok(())
        });
    }

    hub.services.register("tts", "cloud_say", |call| async move {
        info!(
            entity_id = call.get::<String>("entity_id").as_deref().unwrap_or(""),
            message = call.get::<String>("message").as_deref().unwrap_or(""),
            "tts"
        );
        Ok(())
    });

    info!(
        services = hub.services.service_count(),
        "local services registered"
    );
}

/// Seed the boolean flags the apps coordinate through
fn seed_flags(hub: &LocalHub, config: &HouseConfig) -> Result<()> {
    for entity_id in [
        &config.entities.house_occupied,
        &config.entities.guest_mode,
        &config.entities.vacation_mode,
    ] {
        if hub.get_state(entity_id).is_none() {
            hub.set_state(entity_id, "off", Default::default())
                .map_err(|e| anyhow::anyhow!("invalid entity id {}: {}", entity_id, e))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let path = config_path();
    let config = HouseConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    info!(config = %path.display(), "configuration loaded");

    let hub = Arc::new(LocalHub::new());
    register_local_services(&hub, &config);
    seed_flags(&hub, &config)?;

    let host: SharedHost = hub.clone();
    let router = Arc::new(NotificationRouter::new(host.clone(), config.notify.clone()));

    let mut runner = AppRunner::new(host.clone());
    for app in house_apps(host, router, &config) {
        runner.spawn(app);
    }
    info!("agent is running");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    runner.shutdown();

    Ok(())
}
