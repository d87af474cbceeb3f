//! VSL Core - Headless video-sales-letter player
//!
//! This crate provides the player logic behind a landing-page VSL, independent
//! of any UI framework:
//! - Playback control over a platform media binding
//! - Auto-hiding controls with hover and lock handling
//! - Double-tap seek / play-pause gestures
//! - Fullscreen hand-off between the inline player and an overlay
//! - Analytics event emission (play, pause, seek, milestones, ...)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           VslPlayer                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐   hand-off    ┌──────────────┐                │
//! │  │    Inline    │◀─────────────▶│  Fullscreen  │                │
//! │  │   Surface    │               │   Surface    │                │
//! │  └──────┬───────┘               └──────┬───────┘                │
//! │         │                              │                        │
//! │   ┌─────┴──────┬───────────┐           │  (same parts)          │
//! │   │            │           │                                    │
//! │ ┌─┴────────┐ ┌─┴───────┐ ┌─┴─────────┐                          │
//! │ │ Gesture  │ │ Control │ │ Playback  │──────▶ Analytics         │
//! │ │Recognizer│ │  Timer  │ │Controller │        Emitter           │
//! │ └──────────┘ └─────────┘ └─────┬─────┘                          │
//! │                                │                                │
//! │                        ┌───────┴──────┐                         │
//! │                        │ MediaBinding │                         │
//! │                        └──────────────┘                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All timing goes through an injected [`Clock`]; hosts call
//! [`VslPlayer::poll`] to run due timers.

pub mod error;
pub mod types;
pub mod timer;
pub mod media;
pub mod analytics;
pub mod controller;
pub mod visibility;
pub mod gesture;
pub mod surface;
pub mod handoff;
pub mod player;

pub use error::{Error, Result};
pub use types::*;
pub use timer::{Clock, ManualClock, SystemClock, Timer};
pub use media::{AutoplayPolicy, MediaBinding, MediaEvent, SimulatedMedia};
pub use analytics::{
    AnalyticsEmitter, AnalyticsSink, ChannelSink, FanoutSink, FullscreenAction, MemorySink,
    TracingSink, VideoEvent, VideoEventKind,
};
#[cfg(feature = "beacon")]
pub use analytics::BeaconSink;
pub use controller::{PlayToggle, PlaybackController, PlaybackState};
pub use visibility::{ControlVisibility, HideGate, VisibilityPhase};
pub use gesture::{Gesture, GestureRecognizer, Intent, SeekIndicator, Tap, Zone};
pub use surface::{Key, KeyOutcome, PlayerSurface, SurfaceSnapshot, TapOutcome};
pub use handoff::{DesktopScreen, FullscreenHandoff, MediaSnapshot, NoopScreen, ScreenEnvironment, ScreenLease};
pub use player::{PlayerSnapshot, VslPlayer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library
pub fn init() {
    tracing::info!(version = VERSION, "VSL Core initialized");
}
