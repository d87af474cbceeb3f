//! Tap gesture recognition
//!
//! Two taps inside the double-tap window (and, on the fullscreen overlay,
//! within a small horizontal distance) form a double-tap. The player width is
//! split into three zones:
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┐
//! │   seek -10   │  play/pause  │   seek +10   │
//! └──────────────┴──────────────┴──────────────┘
//! 0             W/3           2W/3             W
//! ```
//!
//! Anything else is a single tap, which toggles the controls.

use crate::timer::Timer;
use crate::types::{GestureConfig, Side};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A tap or click on the player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    /// When the tap ended
    pub at: Duration,
    /// Horizontal position relative to the player's left edge (pixels)
    pub x: f64,
    /// Player width (pixels)
    pub width: f64,
}

/// Horizontal thirds of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Back,
    Center,
    Forward,
}

impl Zone {
    pub fn locate(x: f64, width: f64) -> Zone {
        if !(width > 0.0) || !x.is_finite() {
            return Zone::Center;
        }
        if x < width / 3.0 {
            Zone::Back
        } else if x < width * 2.0 / 3.0 {
            Zone::Center
        } else {
            Zone::Forward
        }
    }
}

/// What a recognised gesture asks the player to do
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "seconds", rename_all = "snake_case")]
pub enum Intent {
    ToggleControls,
    TogglePlayPause,
    SeekBy(f64),
}

/// Classification of one tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    DoubleTap(Zone),
    SingleTap,
    /// Single tap held back until the double-tap window closes
    Pending,
}

/// Transient "±10s" badge shown after a seek
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekIndicator {
    /// Magnitude of the skip in seconds
    pub seconds: f64,
    pub side: Side,
    /// Clock time at which the badge disappears
    pub visible_until: Duration,
}

/// Turns taps into gestures
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    last_tap: Option<(Duration, f64)>,
    pending_single: Timer,
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            last_tap: None,
            pending_single: Timer::new(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Intent dispatched for a double-tap in `zone`
    pub fn intent_for(&self, zone: Zone) -> Intent {
        match zone {
            Zone::Back => Intent::SeekBy(-self.config.seek_step_secs),
            Zone::Center => Intent::TogglePlayPause,
            Zone::Forward => Intent::SeekBy(self.config.seek_step_secs),
        }
    }

    fn is_double(&self, tap: &Tap) -> bool {
        let Some((last_at, last_x)) = self.last_tap else {
            return false;
        };
        let Some(dt) = tap.at.checked_sub(last_at) else {
            return false;
        };
        if dt.is_zero() || dt >= self.config.double_tap_window() {
            return false;
        }
        match self.config.max_tap_distance {
            Some(max) => (tap.x - last_x).abs() < max,
            None => true,
        }
    }

    /// Classify a tap and record it as the latest
    pub fn tap(&mut self, tap: Tap) -> Gesture {
        let gesture = if self.is_double(&tap) {
            self.pending_single.cancel();
            Gesture::DoubleTap(Zone::locate(tap.x, tap.width))
        } else if self.config.defer_single_tap {
            self.pending_single.arm(tap.at, self.config.double_tap_window());
            Gesture::Pending
        } else {
            Gesture::SingleTap
        };

        debug!(?gesture, x = tap.x, "Tap classified");
        self.last_tap = Some((tap.at, tap.x));
        gesture
    }

    /// True once a held-back single tap should take effect
    pub fn poll(&mut self, now: Duration) -> bool {
        self.pending_single.fire(now)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending_single.deadline()
    }

    /// Forget tap history and any held-back tap
    pub fn reset(&mut self) {
        self.last_tap = None;
        self.pending_single.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap(at_ms: u64, x: f64) -> Tap {
        Tap {
            at: Duration::from_millis(at_ms),
            x,
            width: 900.0,
        }
    }

    #[test]
    fn test_zones() {
        assert_eq!(Zone::locate(0.0, 900.0), Zone::Back);
        assert_eq!(Zone::locate(299.9, 900.0), Zone::Back);
        assert_eq!(Zone::locate(300.0, 900.0), Zone::Center);
        assert_eq!(Zone::locate(599.9, 900.0), Zone::Center);
        assert_eq!(Zone::locate(600.0, 900.0), Zone::Forward);
        assert_eq!(Zone::locate(900.0, 900.0), Zone::Forward);
        assert_eq!(Zone::locate(10.0, 0.0), Zone::Center);
    }

    #[test]
    fn test_double_tap_within_window_and_distance() {
        let mut rec = GestureRecognizer::new(GestureConfig::default());
        assert_eq!(rec.tap(tap(1000, 700.0)), Gesture::SingleTap);
        assert_eq!(rec.tap(tap(1299, 740.0)), Gesture::DoubleTap(Zone::Forward));
    }

    #[test]
    fn test_slow_taps_are_two_singles() {
        let mut rec = GestureRecognizer::new(GestureConfig::default());
        assert_eq!(rec.tap(tap(1000, 100.0)), Gesture::SingleTap);
        assert_eq!(rec.tap(tap(1300, 100.0)), Gesture::SingleTap);
    }

    #[test]
    fn test_distant_taps_are_two_singles() {
        let mut rec = GestureRecognizer::new(GestureConfig::default());
        rec.tap(tap(1000, 100.0));
        assert_eq!(rec.tap(tap(1100, 150.0)), Gesture::SingleTap);
    }

    #[test]
    fn test_compact_ignores_distance() {
        let mut rec = GestureRecognizer::new(GestureConfig::compact());
        assert_eq!(rec.tap(tap(1000, 100.0)), Gesture::Pending);
        assert_eq!(rec.tap(tap(1100, 800.0)), Gesture::DoubleTap(Zone::Forward));
        // The double-tap swallowed the held-back single tap
        assert!(!rec.poll(Duration::from_millis(5000)));
    }

    #[test]
    fn test_pending_single_matures() {
        let mut rec = GestureRecognizer::new(GestureConfig::compact());
        rec.tap(tap(1000, 450.0));
        assert!(!rec.poll(Duration::from_millis(1299)));
        assert!(rec.poll(Duration::from_millis(1300)));
        assert!(!rec.poll(Duration::from_millis(1400)));
    }

    #[test]
    fn test_simultaneous_taps_are_not_double() {
        let mut rec = GestureRecognizer::new(GestureConfig::default());
        rec.tap(tap(1000, 100.0));
        assert_eq!(rec.tap(tap(1000, 100.0)), Gesture::SingleTap);
    }

    #[test]
    fn test_intents() {
        let rec = GestureRecognizer::new(GestureConfig::default());
        assert_eq!(rec.intent_for(Zone::Back), Intent::SeekBy(-10.0));
        assert_eq!(rec.intent_for(Zone::Center), Intent::TogglePlayPause);
        assert_eq!(rec.intent_for(Zone::Forward), Intent::SeekBy(10.0));
    }
}
