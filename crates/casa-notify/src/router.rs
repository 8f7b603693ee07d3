//! Audience resolution and best-effort dispatch

use casa_config::{ChannelConfig, ChannelKind, NotifyConfig, PersonConfig, StateMatch};
use casa_host::SharedHost;
use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{NotifyRequest, Priority, RouterError};

/// What a single audience token names
enum Audience<'a> {
    /// Everyone currently present
    Home,
    /// Every known person, present or not
    Everyone,
    /// One person's channels
    Person(&'a PersonConfig),
    /// One channel directly
    Channel(&'a ChannelConfig),
}

/// Routes notifications to channels based on live presence and device state
///
/// Holds the static routing table and a host handle; every resolution
/// reads presence facts fresh from the host.
pub struct NotificationRouter {
    host: SharedHost,
    people: Vec<PersonConfig>,
    channels: Vec<ChannelConfig>,
    fallback: Option<String>,
    tts: casa_config::TtsConfig,
}

impl NotificationRouter {
    /// Create a router over the given host and routing table
    pub fn new(host: SharedHost, config: NotifyConfig) -> Self {
        Self {
            host,
            people: config.people,
            channels: config.channels,
            fallback: config.fallback,
            tts: config.tts,
        }
    }

    /// Resolve audience tokens to a deduplicated channel set
    ///
    /// Pure with respect to the table: only live host state varies the
    /// result. Token order determines channel order; a channel reached
    /// through several tokens appears once.
    pub fn resolve(&self, targets: &[String]) -> Result<Vec<&ChannelConfig>, RouterError> {
        if targets.is_empty() {
            return Err(RouterError::NoTargets);
        }

        let mut resolved: IndexMap<&str, &ChannelConfig> = IndexMap::new();

        for token in targets {
            let channels = match self.parse_token(token)? {
                Audience::Home => self
                    .people
                    .iter()
                    .filter(|p| self.is_present(p))
                    .flat_map(|p| self.reachable_channels(p))
                    .collect(),
                Audience::Everyone => self
                    .channels
                    .iter()
                    .filter(|c| c.owner.is_some())
                    .collect(),
                Audience::Person(person) => {
                    let reachable = self.reachable_channels(person);
                    if reachable.is_empty() {
                        self.default_channel(person).into_iter().collect()
                    } else {
                        reachable
                    }
                }
                Audience::Channel(channel) => vec![channel],
            };

            for channel in channels {
                resolved.entry(channel.id.as_str()).or_insert(channel);
            }
        }

        Ok(resolved.into_values().collect())
    }

    /// Resolve and dispatch, shorthand for the common case
    pub async fn send(
        &self,
        targets: &[&str],
        message: &str,
        title: Option<&str>,
    ) -> Result<(), RouterError> {
        let mut request = NotifyRequest::new(targets.iter().copied(), message);
        request.title = title.map(String::from);
        self.send_request(&request).await
    }

    /// Resolve a request and dispatch to every resolved channel
    ///
    /// Best-effort fan-out: a failing channel is logged and skipped, the
    /// rest still get the message. Only configuration errors propagate.
    pub async fn send_request(&self, request: &NotifyRequest) -> Result<(), RouterError> {
        let mut channels = self.resolve(&request.targets)?;

        if channels.is_empty() && request.priority == Priority::High {
            // A must-reach message with nobody resolvable escalates to the
            // configured fallback channel, if there is one.
            if let Some(fallback) = self.fallback_channel() {
                warn!(
                    channel = %fallback.id,
                    "no channels resolved for high-priority message, using fallback"
                );
                channels.push(fallback);
            }
        }

        if channels.is_empty() {
            debug!(targets = ?request.targets, "no channels resolved, nothing to send");
            return Ok(());
        }

        let mut delivered = 0usize;
        for channel in &channels {
            match self.dispatch(channel, request).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(channel = %channel.id, error = %e, "channel dispatch failed");
                }
            }
        }

        info!(
            delivered,
            attempted = channels.len(),
            targets = ?request.targets,
            "notification dispatched"
        );
        Ok(())
    }

    /// Speak a message on the first floor speaker
    pub async fn tts_first_floor(&self, message: &str) {
        self.speak(&self.tts.first_floor, message).await;
    }

    /// Speak a message on the second floor speaker
    pub async fn tts_second_floor(&self, message: &str) {
        self.speak(&self.tts.second_floor, message).await;
    }

    /// Speak a message on every floor
    pub async fn tts_all(&self, message: &str) {
        self.speak(&self.tts.first_floor, message).await;
        self.speak(&self.tts.second_floor, message).await;
    }

    async fn speak(&self, entity_id: &str, message: &str) {
        let result = self
            .host
            .call_service(
                "tts",
                "cloud_say",
                json!({
                    "entity_id": entity_id,
                    "message": message,
                    "language": self.tts.language,
                }),
            )
            .await;

        if let Err(e) = result {
            warn!(entity_id = %entity_id, error = %e, "TTS announcement failed");
        }
    }

    async fn dispatch(
        &self,
        channel: &ChannelConfig,
        request: &NotifyRequest,
    ) -> Result<(), casa_host::HostError> {
        match channel.kind {
            ChannelKind::Push | ChannelKind::Display => {
                let Some(service) = &channel.service else {
                    warn!(channel = %channel.id, "channel has no notify service, skipping");
                    return Ok(());
                };

                let mut payload = serde_json::Map::new();
                payload.insert("message".to_string(), json!(request.message));
                if let Some(title) = &request.title {
                    payload.insert("title".to_string(), json!(title));
                }

                let mut data = request.data.clone();
                if request.priority == Priority::High {
                    let entry = data.get_or_insert_with(|| json!({}));
                    if let Some(map) = entry.as_object_mut() {
                        map.entry("priority".to_string()).or_insert(json!("high"));
                    }
                }
                if let Some(data) = data {
                    payload.insert("data".to_string(), data);
                }

                self.host
                    .call_service("notify", service, Value::Object(payload))
                    .await
            }
            ChannelKind::Speech => {
                let Some(media_player) = &channel.media_player else {
                    warn!(channel = %channel.id, "channel has no media player, skipping");
                    return Ok(());
                };

                // Speech has no notion of a title
                self.host
                    .call_service(
                        "tts",
                        "cloud_say",
                        json!({
                            "entity_id": media_player,
                            "message": request.message,
                            "language": self.tts.language,
                        }),
                    )
                    .await
            }
        }
    }

    fn parse_token<'a>(&'a self, token: &str) -> Result<Audience<'a>, RouterError> {
        match token {
            "home" => Ok(Audience::Home),
            "everyone" => Ok(Audience::Everyone),
            _ => {
                if let Some(person) = self.people.iter().find(|p| p.name == token) {
                    return Ok(Audience::Person(person));
                }
                if let Some(channel) = self.channels.iter().find(|c| c.id == token) {
                    return Ok(Audience::Channel(channel));
                }
                Err(RouterError::UnknownAudience(token.to_string()))
            }
        }
    }

    fn is_present(&self, person: &PersonConfig) -> bool {
        self.host.is_state(&person.entity_id, "home")
    }

    fn matches(&self, condition: &StateMatch) -> bool {
        self.host.is_state(&condition.entity_id, &condition.equals)
    }

    /// A person's channels that are reachable right now
    fn reachable_channels(&self, person: &PersonConfig) -> Vec<&ChannelConfig> {
        self.channels
            .iter()
            .filter(|c| c.owner.as_deref() == Some(person.name.as_str()))
            .filter(|c| c.reachable_when.as_ref().map_or(true, |m| self.matches(m)))
            .collect()
    }

    fn default_channel(&self, person: &PersonConfig) -> Option<&ChannelConfig> {
        let id = person.default_channel.as_deref()?;
        self.channels.iter().find(|c| c.id == id)
    }

    fn fallback_channel(&self) -> Option<&ChannelConfig> {
        let id = self.fallback.as_deref()?;
        self.channels.iter().find(|c| c.id == id)
    }
}
