//! Core types for VSL Player

use crate::{Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a viewing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported playback speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum PlaybackRate {
    Half,
    ThreeQuarters,
    #[default]
    Normal,
    OneAndQuarter,
    OneAndHalf,
    Double,
}

impl PlaybackRate {
    /// All rates in menu order
    pub const ALL: [PlaybackRate; 6] = [
        PlaybackRate::Half,
        PlaybackRate::ThreeQuarters,
        PlaybackRate::Normal,
        PlaybackRate::OneAndQuarter,
        PlaybackRate::OneAndHalf,
        PlaybackRate::Double,
    ];

    pub fn as_f64(self) -> f64 {
        match self {
            PlaybackRate::Half => 0.5,
            PlaybackRate::ThreeQuarters => 0.75,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndQuarter => 1.25,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }

    /// Menu label, e.g. `1.25x`
    pub fn label(self) -> String {
        format!("{}x", self.as_f64())
    }
}

impl TryFrom<f64> for PlaybackRate {
    type Error = Error;

    fn try_from(rate: f64) -> Result<Self> {
        PlaybackRate::ALL
            .into_iter()
            .find(|r| (r.as_f64() - rate).abs() < 1e-9)
            .ok_or(Error::InvalidPlaybackRate { rate })
    }
}

impl From<PlaybackRate> for f64 {
    fn from(rate: PlaybackRate) -> f64 {
        rate.as_f64()
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.as_f64())
    }
}

/// Which edge of the player a seek indicator is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// The two player surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Inline,
    Fullscreen,
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceKind::Inline => write!(f, "inline"),
            SurfaceKind::Fullscreen => write!(f, "fullscreen"),
        }
    }
}

/// Submenus that keep the controls on screen while open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Menu {
    Speed,
    Volume,
    /// Mobile inline settings sheet (speed list)
    Settings,
}

/// Fullscreen brightness filter steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Brightness {
    #[default]
    Full,
    Dimmed,
    Dark,
}

impl Brightness {
    /// Next step in the 100% -> 70% -> 50% -> 100% cycle
    pub fn next(self) -> Self {
        match self {
            Brightness::Full => Brightness::Dimmed,
            Brightness::Dimmed => Brightness::Dark,
            Brightness::Dark => Brightness::Full,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Brightness::Full => 1.0,
            Brightness::Dimmed => 0.7,
            Brightness::Dark => 0.5,
        }
    }
}

/// Volume icon tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeLevel {
    Muted,
    Low,
    High,
}

impl VolumeLevel {
    pub fn from_state(volume: f64, muted: bool) -> Self {
        if muted || volume == 0.0 {
            VolumeLevel::Muted
        } else if volume < 0.5 {
            VolumeLevel::Low
        } else {
            VolumeLevel::High
        }
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` past the hour
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    let hrs = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hrs > 0 {
        format!("{}:{:02}:{:02}", hrs, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Percentage of `current` over `duration`, 0 while the duration is unknown
pub fn percent_of(current: f64, duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 && current.is_finite() {
        (current / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Tap recognition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Maximum gap between taps of a double-tap (milliseconds)
    pub double_tap_window_ms: u64,
    /// Maximum horizontal distance between taps of a double-tap (pixels).
    /// `None` classifies on timing alone.
    pub max_tap_distance: Option<f64>,
    /// Delay single-tap handling until the double-tap window has passed
    pub defer_single_tap: bool,
    /// Seconds skipped by a double-tap in the outer zones
    pub seek_step_secs: f64,
}

impl GestureConfig {
    /// Compact variant used by the inline player
    pub fn compact() -> Self {
        Self {
            max_tap_distance: None,
            defer_single_tap: true,
            ..Default::default()
        }
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_tap_window_ms: 300,
            max_tap_distance: Some(50.0),
            defer_single_tap: false,
            seek_step_secs: 10.0,
        }
    }
}

/// Per-surface behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Which surface this configures
    pub kind: SurfaceKind,
    /// Touch device: taps drive visibility, hover never persists it
    pub touch: bool,
    /// Idle time before controls auto-hide (milliseconds)
    pub hide_delay_ms: u64,
    /// Hide delay after a desktop pointer leaves the player (milliseconds)
    pub pointer_leave_delay_ms: u64,
    /// How long a seek indicator stays up (milliseconds)
    pub indicator_duration_ms: u64,
    /// Hide delay after a tap while locked (milliseconds)
    pub lock_hint_ms: u64,
    /// Volume restored by unmute when nothing better is known
    pub default_volume: f64,
    /// Keyboard volume step
    pub volume_step: f64,
    /// Tap recognition
    pub gesture: GestureConfig,
}

impl SurfaceConfig {
    /// Inline player preset
    pub fn inline(touch: bool) -> Self {
        Self {
            kind: SurfaceKind::Inline,
            touch,
            gesture: GestureConfig::compact(),
            ..Default::default()
        }
    }

    /// Fullscreen overlay preset
    pub fn fullscreen() -> Self {
        Self {
            kind: SurfaceKind::Fullscreen,
            touch: true,
            gesture: GestureConfig::default(),
            ..Default::default()
        }
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub fn pointer_leave_delay(&self) -> Duration {
        Duration::from_millis(self.pointer_leave_delay_ms)
    }

    pub fn indicator_duration(&self) -> Duration {
        Duration::from_millis(self.indicator_duration_ms)
    }

    pub fn lock_hint(&self) -> Duration {
        Duration::from_millis(self.lock_hint_ms)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.hide_delay_ms == 0 {
            return Err(Error::InvalidConfig(format!(
                "{} hide_delay_ms must be positive",
                self.kind
            )));
        }
        if !(self.default_volume > 0.0 && self.default_volume <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "{} default_volume must be in (0, 1], got {}",
                self.kind, self.default_volume
            )));
        }
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "{} volume_step must be in (0, 1], got {}",
                self.kind, self.volume_step
            )));
        }
        if !(self.gesture.seek_step_secs > 0.0) {
            return Err(Error::InvalidConfig("seek_step_secs must be positive".into()));
        }
        if let Some(distance) = self.gesture.max_tap_distance {
            if !(distance > 0.0) {
                return Err(Error::InvalidConfig("max_tap_distance must be positive".into()));
            }
        }
        Ok(())
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            kind: SurfaceKind::Inline,
            touch: false,
            hide_delay_ms: 3000,
            pointer_leave_delay_ms: 500,
            indicator_duration_ms: 800,
            lock_hint_ms: 1500,
            default_volume: 0.7,
            volume_step: 0.1,
            gesture: GestureConfig::default(),
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Name attached to every analytics event
    pub video_name: String,
    /// Start muted playback when the player scrolls into view
    pub autoplay_on_scroll: bool,
    /// Visible fraction that counts as "in view"
    pub autoplay_visibility_threshold: f64,
    /// Enable analytics
    pub analytics_enabled: bool,
    /// Inline surface settings
    #[serde(deserialize_with = "inline_slot")]
    pub inline: SurfaceConfig,
    /// Fullscreen overlay settings
    #[serde(deserialize_with = "fullscreen_slot")]
    pub fullscreen: SurfaceConfig,
}

fn inline_slot<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SurfaceConfig, D::Error> {
    overlay_preset(deserializer, SurfaceConfig::inline(false))
}

fn fullscreen_slot<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<SurfaceConfig, D::Error> {
    overlay_preset(deserializer, SurfaceConfig::fullscreen())
}

/// Read a partial surface block, taking missing fields from `preset`
fn overlay_preset<'de, D: Deserializer<'de>>(
    deserializer: D,
    preset: SurfaceConfig,
) -> std::result::Result<SurfaceConfig, D::Error> {
    let patch = serde_json::Value::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(preset).map_err(D::Error::custom)?;
    merge_json(&mut merged, patch);
    serde_json::from_value(merged).map_err(D::Error::custom)
}

fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(base.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (base, patch) => *base = patch,
    }
}

impl PlayerConfig {
    /// Defaults tuned for phones: taps instead of hover on both surfaces
    pub fn mobile() -> Self {
        Self {
            inline: SurfaceConfig::inline(true),
            ..Default::default()
        }
    }

    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.autoplay_visibility_threshold) {
            return Err(Error::InvalidConfig(format!(
                "autoplay_visibility_threshold must be in [0, 1], got {}",
                self.autoplay_visibility_threshold
            )));
        }
        if self.inline.kind != SurfaceKind::Inline || self.fullscreen.kind != SurfaceKind::Fullscreen {
            return Err(Error::InvalidConfig("surface kinds do not match their slots".into()));
        }
        self.inline.validate()?;
        self.fullscreen.validate()
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_name: "vsl".to_string(),
            autoplay_on_scroll: true,
            autoplay_visibility_threshold: 0.5,
            analytics_enabled: true,
            inline: SurfaceConfig::inline(false),
            fullscreen: SurfaceConfig::fullscreen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_conversion() {
        assert_eq!(PlaybackRate::try_from(1.25).unwrap(), PlaybackRate::OneAndQuarter);
        assert_eq!(PlaybackRate::try_from(2.0).unwrap(), PlaybackRate::Double);
        assert!(matches!(
            PlaybackRate::try_from(3.0),
            Err(Error::InvalidPlaybackRate { .. })
        ));
        assert!(PlaybackRate::try_from(f64::NAN).is_err());
        assert_eq!(PlaybackRate::ThreeQuarters.label(), "0.75x");
    }

    #[test]
    fn test_rate_serde_as_number() {
        let json = serde_json::to_string(&PlaybackRate::OneAndHalf).unwrap();
        assert_eq!(json, "1.5");
        assert!(serde_json::from_str::<PlaybackRate>("1.1").is_err());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3725.0), "1:02:05");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn test_percent_guards_unknown_duration() {
        assert_eq!(percent_of(10.0, 0.0), 0.0);
        assert_eq!(percent_of(10.0, f64::NAN), 0.0);
        assert_eq!(percent_of(25.0, 100.0), 25.0);
    }

    #[test]
    fn test_brightness_cycle() {
        let b = Brightness::default();
        assert_eq!(b.next(), Brightness::Dimmed);
        assert_eq!(b.next().next().factor(), 0.5);
        assert_eq!(b.next().next().next(), Brightness::Full);
    }

    #[test]
    fn test_volume_level() {
        assert_eq!(VolumeLevel::from_state(0.8, true), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::from_state(0.0, false), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::from_state(0.3, false), VolumeLevel::Low);
        assert_eq!(VolumeLevel::from_state(0.5, false), VolumeLevel::High);
    }

    #[test]
    fn test_config_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.inline.hide_delay_ms, 3000);
        assert_eq!(config.inline.pointer_leave_delay_ms, 500);
        assert_eq!(config.inline.gesture.max_tap_distance, None);
        assert_eq!(config.fullscreen.gesture.max_tap_distance, Some(50.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_partial() {
        let config = PlayerConfig::from_json(r#"{"video_name": "demo"}"#).unwrap();
        assert_eq!(config.video_name, "demo");
        assert_eq!(config.fullscreen.lock_hint_ms, 1500);

        let bad = PlayerConfig::from_json(r#"{"autoplay_visibility_threshold": 2.0}"#);
        assert!(matches!(bad, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_partial_surface_keeps_slot_preset() {
        let config = PlayerConfig::from_json(
            r#"{
                "inline": {"touch": true},
                "fullscreen": {"hide_delay_ms": 2000, "gesture": {"seek_step_secs": 5}}
            }"#,
        )
        .unwrap();

        assert_eq!(config.fullscreen.kind, SurfaceKind::Fullscreen);
        assert_eq!(config.fullscreen.hide_delay_ms, 2000);
        assert!(config.fullscreen.touch);
        assert_eq!(config.fullscreen.gesture.seek_step_secs, 5.0);
        assert_eq!(config.fullscreen.gesture.max_tap_distance, Some(50.0));

        assert_eq!(config.inline, SurfaceConfig::inline(true));

        let mismatched = PlayerConfig::from_json(r#"{"fullscreen": {"kind": "inline"}}"#);
        assert!(matches!(mismatched, Err(Error::InvalidConfig(_))));
    }
}
