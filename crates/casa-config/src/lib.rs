//! House configuration
//!
//! One YAML file declares everything the apps and the notification router
//! need to know about the house: who lives there, which delivery channels
//! exist and when they are reachable, which entities wire the automations,
//! and the timing knobs. The routing table portion is static; it is read
//! once at startup and never mutated.

mod error;
mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    ArrivalConfig, BatteryConfig, ChannelConfig, ChannelKind, EntitiesConfig, EntryPoint,
    HouseConfig, LocationConfig, NotifyConfig, PersonConfig, StateMatch, TimingConfig, TtsConfig,
};

use std::fs;
use std::path::Path;
use tracing::{debug, info};

impl HouseConfig {
    /// Load and validate configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: HouseConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;

        info!(
            people = config.notify.people.len(),
            channels = config.notify.channels.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check cross-references between sections
    pub fn validate(&self) -> ConfigResult<()> {
        let notify = &self.notify;

        for channel in &notify.channels {
            match channel.kind {
                ChannelKind::Push | ChannelKind::Display => {
                    if channel.service.is_none() {
                        return Err(ConfigError::Invalid(format!(
                            "channel '{}' is {:?} but has no notify service",
                            channel.id, channel.kind
                        )));
                    }
                }
                ChannelKind::Speech => {
                    if channel.media_player.is_none() {
                        return Err(ConfigError::Invalid(format!(
                            "channel '{}' is speech but has no media_player",
                            channel.id
                        )));
                    }
                }
            }

            if let Some(owner) = &channel.owner {
                if !notify.people.iter().any(|p| &p.name == owner) {
                    return Err(ConfigError::Invalid(format!(
                        "channel '{}' is owned by unknown person '{}'",
                        channel.id, owner
                    )));
                }
            }
        }

        let channel_exists = |id: &str| notify.channels.iter().any(|c| c.id == id);

        for person in &notify.people {
            if let Some(default) = &person.default_channel {
                if !channel_exists(default) {
                    return Err(ConfigError::Invalid(format!(
                        "person '{}' defaults to unknown channel '{}'",
                        person.name, default
                    )));
                }
            }
        }

        if let Some(fallback) = &notify.fallback {
            if !channel_exists(fallback) {
                return Err(ConfigError::Invalid(format!(
                    "fallback names unknown channel '{}'",
                    fallback
                )));
            }
        }

        // Periodic sweeps tick on an interval, which cannot be zero
        for (name, secs) in [
            (
                "vacation_check_interval_secs",
                self.timing.vacation_check_interval_secs,
            ),
            (
                "battery_check_interval_secs",
                self.timing.battery_check_interval_secs,
            ),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "timing.{} must be greater than zero",
                    name
                )));
            }
        }

        if let Some(arrival) = &self.arrival {
            for name in [&arrival.watch, &arrival.notify] {
                if !notify.people.iter().any(|p| &p.name == name) {
                    return Err(ConfigError::Invalid(format!(
                        "arrival config references unknown person '{}'",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}
