//! Configuration data model

use serde::{Deserialize, Serialize};

/// Top-level house configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HouseConfig {
    /// Routing table and TTS targets
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Entity wiring for the apps
    #[serde(default)]
    pub entities: EntitiesConfig,

    /// Timing knobs
    #[serde(default)]
    pub timing: TimingConfig,

    /// Home location for the vacation checks
    #[serde(default)]
    pub location: LocationConfig,

    /// Battery sweep settings
    #[serde(default)]
    pub battery: BatteryConfig,

    /// Arrival notification pairing; absent disables the app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<ArrivalConfig>,
}

/// The static routing table: people, channels, fallback, TTS targets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Tracked people
    #[serde(default)]
    pub people: Vec<PersonConfig>,

    /// Delivery channels
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,

    /// Channel that receives high-priority messages nobody else would get
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,

    /// TTS speaker wiring
    #[serde(default)]
    pub tts: TtsConfig,
}

/// A tracked person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonConfig {
    /// Audience token naming this person (e.g. "javier")
    pub name: String,

    /// Presence entity, "home" when present (e.g. "person.javier")
    pub entity_id: String,

    /// Notify service of the person's phone, used for location-update pings
    pub phone_service: String,

    /// Channel to use when none of the person's channels are reachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,

    /// GPS device tracker entity, for the distance fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<String>,

    /// Geocoded location sensor carrying a country attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoded: Option<String>,
}

/// What kind of delivery a channel performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Phone push notification
    Push,
    /// Tablet or TV on-screen notification
    Display,
    /// Spoken TTS announcement
    Speech,
}

/// A concrete delivery endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Audience token naming this channel directly
    pub id: String,

    /// Delivery kind
    pub kind: ChannelKind,

    /// Notify service name, for push and display channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Media player entity, for speech channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_player: Option<String>,

    /// Person whose audience includes this channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Condition gating reachability; absent means always reachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachable_when: Option<StateMatch>,
}

/// A live state condition: entity must currently equal a value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMatch {
    pub entity_id: String,
    pub equals: String,
}

/// TTS speaker wiring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// First floor speaker entity
    #[serde(default = "default_tts_first_floor")]
    pub first_floor: String,

    /// Second floor speaker entity
    #[serde(default = "default_tts_second_floor")]
    pub second_floor: String,

    /// Announcement language
    #[serde(default = "default_tts_language")]
    pub language: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            first_floor: default_tts_first_floor(),
            second_floor: default_tts_second_floor(),
            language: default_tts_language(),
        }
    }
}

fn default_tts_first_floor() -> String {
    "media_player.first_floor_xiaomi_gateway".to_string()
}

fn default_tts_second_floor() -> String {
    "media_player.second_floor_xiaomi_gateway".to_string()
}

fn default_tts_language() -> String {
    "es-ES".to_string()
}

/// An entry point to the house
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Door/gate binary sensor, "on" when open
    pub entity_id: String,
    /// Name used in alerts (e.g. "Front door")
    pub name: String,
}

/// Entity wiring for the apps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitiesConfig {
    #[serde(default = "default_house_occupied")]
    pub house_occupied: String,

    #[serde(default = "default_guest_mode")]
    pub guest_mode: String,

    #[serde(default = "default_vacation_mode")]
    pub vacation_mode: String,

    #[serde(default = "default_sun")]
    pub sun: String,

    #[serde(default = "default_home_zone")]
    pub home_zone: String,

    /// Doors and gates watched by security and welcome
    #[serde(default = "default_entry_points")]
    pub entry_points: Vec<EntryPoint>,

    /// Group turned on when arriving after sunset
    #[serde(default = "default_living_room_lights")]
    pub living_room_lights: String,

    /// Group of outside lights
    #[serde(default = "default_outside_lights")]
    pub outside_lights: String,

    /// Group of everything that should be off when the house is empty
    #[serde(default = "default_all_devices")]
    pub all_devices: String,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            house_occupied: default_house_occupied(),
            guest_mode: default_guest_mode(),
            vacation_mode: default_vacation_mode(),
            sun: default_sun(),
            home_zone: default_home_zone(),
            entry_points: default_entry_points(),
            living_room_lights: default_living_room_lights(),
            outside_lights: default_outside_lights(),
            all_devices: default_all_devices(),
        }
    }
}

fn default_house_occupied() -> String {
    "input_boolean.house_occupied".to_string()
}

fn default_guest_mode() -> String {
    "input_boolean.guest_mode".to_string()
}

fn default_vacation_mode() -> String {
    "input_boolean.vacation_mode".to_string()
}

fn default_sun() -> String {
    "sun.sun".to_string()
}

fn default_home_zone() -> String {
    "zone.home".to_string()
}

fn default_entry_points() -> Vec<EntryPoint> {
    vec![
        EntryPoint {
            entity_id: "binary_sensor.front_door_state".to_string(),
            name: "Front door".to_string(),
        },
        EntryPoint {
            entity_id: "binary_sensor.back_gate_state".to_string(),
            name: "Back gate".to_string(),
        },
    ]
}

fn default_living_room_lights() -> String {
    "group.living_room_lights_and_switches".to_string()
}

fn default_outside_lights() -> String {
    "group.outside".to_string()
}

fn default_all_devices() -> String {
    "group.all_switch_and_devices".to_string()
}

/// Timing knobs, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Buffer before house_occupied turns off after everyone leaves
    #[serde(default = "default_departure_delay")]
    pub departure_delay_secs: u64,

    /// Wait for occupancy after an entry opens while unoccupied
    #[serde(default = "default_entry_alert")]
    pub entry_alert_secs: u64,

    /// Window in which the house counts as "just became occupied"
    #[serde(default = "default_welcome_recent")]
    pub welcome_recent_secs: u64,

    /// Delay between door opening and the welcome announcement
    #[serde(default = "default_welcome_tts_delay")]
    pub welcome_tts_delay_secs: u64,

    /// Window in which two arrivals count as arriving together
    #[serde(default = "default_arrival_together")]
    pub arrival_together_secs: u64,

    /// Wait after leaving before checking what was left on
    #[serde(default = "default_left_on_wait")]
    pub left_on_wait_secs: u64,

    /// Interval of the left-on sweep while in vacation mode
    #[serde(default = "default_vacation_check")]
    pub vacation_check_interval_secs: u64,

    /// Interval of the battery sweep
    #[serde(default = "default_battery_interval")]
    pub battery_check_interval_secs: u64,

    /// Delay before the startup battery sweep, letting entities load
    #[serde(default = "default_battery_startup_delay")]
    pub battery_startup_delay_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            departure_delay_secs: default_departure_delay(),
            entry_alert_secs: default_entry_alert(),
            welcome_recent_secs: default_welcome_recent(),
            welcome_tts_delay_secs: default_welcome_tts_delay(),
            arrival_together_secs: default_arrival_together(),
            left_on_wait_secs: default_left_on_wait(),
            vacation_check_interval_secs: default_vacation_check(),
            battery_check_interval_secs: default_battery_interval(),
            battery_startup_delay_secs: default_battery_startup_delay(),
        }
    }
}

fn default_departure_delay() -> u64 {
    300
}

fn default_entry_alert() -> u64 {
    30
}

fn default_welcome_recent() -> u64 {
    300
}

fn default_welcome_tts_delay() -> u64 {
    5
}

fn default_arrival_together() -> u64 {
    300
}

fn default_left_on_wait() -> u64 {
    120
}

fn default_vacation_check() -> u64 {
    7200
}

fn default_battery_interval() -> u64 {
    86400
}

fn default_battery_startup_delay() -> u64 {
    60
}

/// Home location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// ISO country code of home; being in another country means "far"
    #[serde(default = "default_home_country")]
    pub home_country: String,

    /// Distance fallback threshold when no country data is available
    #[serde(default = "default_far_km")]
    pub far_from_home_km: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            home_country: default_home_country(),
            far_from_home_km: default_far_km(),
        }
    }
}

fn default_home_country() -> String {
    "PA".to_string()
}

fn default_far_km() -> f64 {
    100.0
}

/// Battery sweep settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Alert when a battery level drops below this percentage
    #[serde(default = "default_battery_threshold")]
    pub threshold: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            threshold: default_battery_threshold(),
        }
    }
}

fn default_battery_threshold() -> f64 {
    20.0
}

/// Arrival notification pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalConfig {
    /// Person whose arrival is announced
    pub watch: String,
    /// Person who receives the announcement
    pub notify: String,
}
