//! Router behavior against a capturing host

use std::sync::Arc;

use casa_config::{ChannelConfig, ChannelKind, NotifyConfig, PersonConfig, StateMatch, TtsConfig};
use casa_host::testing::TestHub;
use casa_notify::{NotificationRouter, NotifyRequest, RouterError};
use serde_json::json;
use tokio_test::assert_ok;

fn person(name: &str) -> PersonConfig {
    PersonConfig {
        name: name.to_string(),
        entity_id: format!("person.{}", name),
        phone_service: format!("mobile_app_{}_phone", name),
        default_channel: Some(format!("{}_phone", name)),
        tracker: None,
        geocoded: None,
    }
}

fn push(id: &str, service: &str, owner: &str) -> ChannelConfig {
    ChannelConfig {
        id: id.to_string(),
        kind: ChannelKind::Push,
        service: Some(service.to_string()),
        media_player: None,
        owner: Some(owner.to_string()),
        reachable_when: None,
    }
}

/// The household: two people, phones always reachable, javier's tablet
/// reachable only while unlocked, a TV and a speaker addressable directly.
fn table() -> NotifyConfig {
    NotifyConfig {
        people: vec![person("javier"), person("andy")],
        channels: vec![
            push("javier_phone", "mobile_app_javier_phone", "javier"),
            ChannelConfig {
                id: "javier_tablet".to_string(),
                kind: ChannelKind::Display,
                service: Some("mobile_app_javier_tablet".to_string()),
                media_player: None,
                owner: Some("javier".to_string()),
                reachable_when: Some(StateMatch {
                    entity_id: "binary_sensor.javier_tablet_device_locked".to_string(),
                    equals: "off".to_string(),
                }),
            },
            push("andy_phone", "mobile_app_andy_phone", "andy"),
            ChannelConfig {
                id: "living_room_tv".to_string(),
                kind: ChannelKind::Display,
                service: Some("living_room_tv".to_string()),
                media_player: None,
                owner: None,
                reachable_when: None,
            },
            ChannelConfig {
                id: "first_floor_speaker".to_string(),
                kind: ChannelKind::Speech,
                service: None,
                media_player: Some("media_player.first_floor_xiaomi_gateway".to_string()),
                owner: None,
                reachable_when: None,
            },
        ],
        fallback: Some("javier_phone".to_string()),
        tts: TtsConfig::default(),
    }
}

fn router(hub: &Arc<TestHub>) -> NotificationRouter {
    NotificationRouter::new(hub.clone(), table())
}

#[tokio::test]
async fn known_targets_dispatch_without_error() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "home");
    let router = router(&hub);

    assert_ok!(
        router
            .send(&["javier"], "lavadora lista", Some("Home Assistant"))
            .await
    );

    assert!(!hub.calls().is_empty());
    let call = &hub.calls_to("notify.mobile_app_javier_phone")[0];
    assert_eq!(call.get::<String>("message").as_deref(), Some("lavadora lista"));
    assert_eq!(call.get::<String>("title").as_deref(), Some("Home Assistant"));
}

#[tokio::test]
async fn home_with_nobody_present_is_a_silent_no_op() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "not_home");
    hub.set_state("person.andy", "not_home");
    let router = router(&hub);

    assert_ok!(router.send(&["home"], "anyone there?", None).await);

    hub.assert_call_count(0);
}

#[tokio::test]
async fn everyone_ignores_presence() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "not_home");
    hub.set_state("person.andy", "not_home");
    // Tablet locked, so it would not be reachable either
    hub.set_state("binary_sensor.javier_tablet_device_locked", "on");
    let router = router(&hub);

    let channels = router
        .resolve(&["everyone".to_string()])
        .unwrap()
        .iter()
        .map(|c| c.id.clone())
        .collect::<Vec<_>>();

    // All owned channels, regardless of presence or reachability
    assert_eq!(channels, vec!["javier_phone", "javier_tablet", "andy_phone"]);
}

#[tokio::test]
async fn overlapping_tokens_deliver_once_per_channel() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "home");
    hub.set_state("person.andy", "not_home");
    hub.set_state("binary_sensor.javier_tablet_device_locked", "off");
    let router = router(&hub);

    // javier is home, so "home" and "javier" resolve to the same channels
    router
        .send(&["home", "javier"], "dinner is ready", None)
        .await
        .unwrap();

    assert_eq!(hub.calls_to("notify.mobile_app_javier_phone").len(), 1);
    assert_eq!(hub.calls_to("notify.mobile_app_javier_tablet").len(), 1);
    hub.assert_call_count(2);
}

#[tokio::test]
async fn unknown_token_is_a_configuration_error() {
    let hub = Arc::new(TestHub::new());
    let router = router(&hub);

    let err = router.send(&["garage_robot"], "x", None).await.unwrap_err();
    assert_eq!(err, RouterError::UnknownAudience("garage_robot".to_string()));
    hub.assert_call_count(0);
}

#[tokio::test]
async fn empty_targets_are_rejected() {
    let hub = Arc::new(TestHub::new());
    let router = router(&hub);

    let err = router.send(&[], "x", None).await.unwrap_err();
    assert_eq!(err, RouterError::NoTargets);
}

#[tokio::test]
async fn one_failing_channel_does_not_block_the_rest() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "home");
    hub.set_state("person.andy", "home");
    hub.fail_service("notify", "mobile_app_javier_phone");
    let router = router(&hub);

    router.send(&["home"], "still gets through", None).await.unwrap();

    // Both were attempted, andy's still arrived
    assert_eq!(hub.calls_to("notify.mobile_app_javier_phone").len(), 1);
    assert_eq!(hub.calls_to("notify.mobile_app_andy_phone").len(), 1);
}

#[tokio::test]
async fn unreachable_person_falls_back_to_default_channel() {
    let hub = Arc::new(TestHub::new());
    let mut config = table();
    // All of javier's channels gated on the tablet being unlocked
    for channel in &mut config.channels {
        if channel.owner.as_deref() == Some("javier") {
            channel.reachable_when = Some(StateMatch {
                entity_id: "binary_sensor.javier_tablet_device_locked".to_string(),
                equals: "off".to_string(),
            });
        }
    }
    hub.set_state("binary_sensor.javier_tablet_device_locked", "on");
    let router = NotificationRouter::new(hub.clone(), config);

    router.send(&["javier"], "wake up", None).await.unwrap();

    // Nothing reachable, default channel takes the message
    assert_eq!(hub.calls_to("notify.mobile_app_javier_phone").len(), 1);
    hub.assert_call_count(1);
}

#[tokio::test]
async fn device_token_resolves_unconditionally() {
    let hub = Arc::new(TestHub::new());
    let router = router(&hub);

    // TV is off and nobody is home; a direct channel token still delivers
    router.send(&["living_room_tv"], "doorbell", None).await.unwrap();

    assert_eq!(hub.calls_to("notify.living_room_tv").len(), 1);
}

#[tokio::test]
async fn speech_channel_speaks_and_drops_the_title() {
    let hub = Arc::new(TestHub::new());
    let router = router(&hub);

    let request = NotifyRequest::new(["first_floor_speaker"], "La cena está lista")
        .title("Dinner Time");
    router.send_request(&request).await.unwrap();

    let calls = hub.calls_to("tts.cloud_say");
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].get::<String>("entity_id").as_deref(),
        Some("media_player.first_floor_xiaomi_gateway")
    );
    assert_eq!(
        calls[0].get::<String>("message").as_deref(),
        Some("La cena está lista")
    );
    assert_eq!(calls[0].get::<String>("language").as_deref(), Some("es-ES"));
    // Spoken announcements have no title field to carry
    assert!(calls[0].service_data.get("title").is_none());
    assert!(hub.calls_to("notify.mobile_app_javier_phone").is_empty());
}

#[tokio::test]
async fn high_priority_with_empty_resolution_escalates_to_fallback() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "not_home");
    hub.set_state("person.andy", "not_home");
    let router = router(&hub);

    let request = NotifyRequest::new(["home"], "pipe burst").high_priority();
    router.send_request(&request).await.unwrap();

    let calls = hub.calls_to("notify.mobile_app_javier_phone");
    assert_eq!(calls.len(), 1);
    // Priority rides along in the companion-app data payload
    assert_eq!(calls[0].service_data["data"]["priority"], "high");
}

#[tokio::test]
async fn normal_priority_with_empty_resolution_does_not_escalate() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "not_home");
    hub.set_state("person.andy", "not_home");
    let router = router(&hub);

    router.send(&["home"], "routine note", None).await.unwrap();
    hub.assert_call_count(0);
}

#[tokio::test]
async fn action_payload_reaches_the_channel() {
    let hub = Arc::new(TestHub::new());
    let router = router(&hub);

    let request = NotifyRequest::new(["javier"], "things are on")
        .title("Something is turned ON")
        .data(json!({
            "tag": "house_turned_on",
            "actions": [{"action": "turn_everything_off", "title": "Turn everything off"}],
        }));
    router.send_request(&request).await.unwrap();

    let call = &hub.calls_to("notify.mobile_app_javier_phone")[0];
    assert_eq!(call.service_data["data"]["tag"], "house_turned_on");
    assert_eq!(
        call.service_data["data"]["actions"][0]["action"],
        "turn_everything_off"
    );
}

#[tokio::test]
async fn tts_wrappers_speak_on_fixed_speakers() {
    let hub = Arc::new(TestHub::new());
    let router = router(&hub);

    router.tts_first_floor("Bienvenidos a casa").await;
    router.tts_all("Buenas noches").await;

    let calls = hub.calls_to("tts.cloud_say");
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[0].get::<String>("entity_id").as_deref(),
        Some("media_player.first_floor_xiaomi_gateway")
    );
    assert_eq!(calls[0].get::<String>("language").as_deref(), Some("es-ES"));
    assert_eq!(
        calls[2].get::<String>("entity_id").as_deref(),
        Some("media_player.second_floor_xiaomi_gateway")
    );
}

#[tokio::test]
async fn resolution_is_stable_without_state_changes() {
    let hub = Arc::new(TestHub::new());
    hub.set_state("person.javier", "home");
    hub.set_state("binary_sensor.javier_tablet_device_locked", "off");
    let router = router(&hub);

    let targets = vec!["home".to_string(), "andy".to_string()];
    let first: Vec<String> = router
        .resolve(&targets)
        .unwrap()
        .iter()
        .map(|c| c.id.clone())
        .collect();
    let second: Vec<String> = router
        .resolve(&targets)
        .unwrap()
        .iter()
        .map(|c| c.id.clone())
        .collect();

    assert_eq!(first, second);
}
