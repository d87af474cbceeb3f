//! Player surface - one inline player or fullscreen overlay
//!
//! A surface ties the playback controller to its control-visibility timer,
//! gesture recognizer and overlay-only UI state (menus, lock, brightness).
//! Every viewer input goes through here so the lock check happens before
//! anything reaches the controller. Media notifications are never blocked.

use crate::{
    analytics::AnalyticsEmitter,
    controller::{PlayToggle, PlaybackController, PlaybackState},
    gesture::{Gesture, GestureRecognizer, Intent, SeekIndicator, Tap},
    media::{MediaBinding, MediaEvent},
    timer::Clock,
    types::{Brightness, Menu, SurfaceConfig, SurfaceKind},
    visibility::{ControlVisibility, HideGate},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Keys handled by the fullscreen overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Space,
    K,
    M,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

impl FromStr for Key {
    type Err = Error;

    /// Parse a DOM `KeyboardEvent.key` value
    fn from_str(s: &str) -> Result<Self> {
        match s {
            " " | "Space" | "space" => Ok(Key::Space),
            "k" | "K" => Ok(Key::K),
            "m" | "M" => Ok(Key::M),
            "Escape" | "escape" => Ok(Key::Escape),
            "ArrowLeft" | "arrow_left" => Ok(Key::ArrowLeft),
            "ArrowRight" | "arrow_right" => Ok(Key::ArrowRight),
            "ArrowUp" | "arrow_up" => Ok(Key::ArrowUp),
            "ArrowDown" | "arrow_down" => Ok(Key::ArrowDown),
            other => Err(Error::UnknownKey(other.to_string())),
        }
    }
}

/// What a key press did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    /// The overlay should close
    Close,
    Ignored,
}

/// What a tap did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// Desktop inline clicks are handled by the buttons, not the tap layer
    Ignored,
    /// Locked: controls shown briefly
    LockHint,
    /// Single tap waiting out the double-tap window
    Pending,
    ToggledControls { visible: bool },
    Intent(Intent),
}

/// Serializable view of a surface for hosts and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    pub kind: SurfaceKind,
    pub playback: PlaybackState,
    pub controls_visible: bool,
    pub menu: Option<Menu>,
    pub locked: bool,
    pub brightness: Brightness,
    pub seek_indicator: Option<SeekIndicator>,
}

/// One interactive player surface over a media binding
pub struct PlayerSurface<M: MediaBinding> {
    config: SurfaceConfig,
    controller: PlaybackController<M>,
    visibility: ControlVisibility,
    gestures: GestureRecognizer,
    indicator: Option<SeekIndicator>,
    menu: Option<Menu>,
    locked: bool,
    brightness: Brightness,
    clock: Arc<dyn Clock>,
}

impl<M: MediaBinding> PlayerSurface<M> {
    pub fn new(
        media: M,
        config: SurfaceConfig,
        analytics: AnalyticsEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let controller = PlaybackController::new(media, analytics, config.default_volume);
        let visibility = ControlVisibility::new(&config);
        let gestures = GestureRecognizer::new(config.gesture.clone());

        Self {
            config,
            controller,
            visibility,
            gestures,
            indicator: None,
            menu: None,
            locked: false,
            brightness: Brightness::default(),
            clock,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self) -> SurfaceKind {
        self.config.kind
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn state(&self) -> &PlaybackState {
        self.controller.state()
    }

    pub fn controller(&self) -> &PlaybackController<M> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController<M> {
        &mut self.controller
    }

    pub fn media(&self) -> &M {
        self.controller.media()
    }

    pub fn media_mut(&mut self) -> &mut M {
        self.controller.media_mut()
    }

    pub fn into_media(self) -> M {
        self.controller.into_media()
    }

    pub fn visibility(&self) -> &ControlVisibility {
        &self.visibility
    }

    pub fn controls_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    pub fn open_menu(&self) -> Option<Menu> {
        self.menu
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    /// Current seek indicator, if it has not expired yet
    pub fn seek_indicator(&self) -> Option<SeekIndicator> {
        let now = self.clock.now();
        self.indicator.filter(|i| i.visible_until > now)
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            kind: self.config.kind,
            playback: self.controller.state().clone(),
            controls_visible: self.visibility.is_visible(),
            menu: self.menu,
            locked: self.locked,
            brightness: self.brightness,
            seek_indicator: self.seek_indicator(),
        }
    }

    fn gate(&self) -> HideGate {
        HideGate {
            playing: self.controller.state().is_playing,
            menu_open: self.menu.is_some(),
            locked: self.locked,
        }
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn ignore_if_locked(&self, action: &str) -> bool {
        if self.locked {
            debug!(action, "Ignored while locked");
        }
        self.locked
    }

    /// A control was used: show the controls and restart the hide countdown
    fn restart_hide(&mut self, now: Duration) {
        let gate = self.gate();
        self.visibility.on_input(now, gate);
    }

    /// Keep visibility consistent with the play state: playing arms a hide,
    /// anything else forces the controls on.
    fn sync_visibility(&mut self, now: Duration) {
        if self.controller.state().is_playing && !self.locked {
            self.restart_hide(now);
        } else {
            self.visibility.force_visible();
        }
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Play or pause. `None` while locked.
    pub fn toggle_play_pause(&mut self) -> Option<PlayToggle> {
        if self.ignore_if_locked("play_pause") {
            return None;
        }
        let result = self.controller.toggle_play_pause();
        self.sync_visibility(self.now());
        Some(result)
    }

    /// Skip relative to the playhead and show the seek indicator
    pub fn seek_by(&mut self, delta: f64) {
        if self.ignore_if_locked("seek") {
            return;
        }
        let now = self.now();
        let side = self.controller.seek_by(delta);
        self.indicator = Some(SeekIndicator {
            seconds: delta.abs(),
            side,
            visible_until: now + self.config.indicator_duration(),
        });
        self.restart_hide(now);
    }

    /// Progress-bar click or drag
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        if self.ignore_if_locked("seek") {
            return;
        }
        self.controller.seek_to_fraction(fraction);
        self.restart_hide(self.now());
    }

    pub fn set_volume(&mut self, volume: f64) {
        if self.ignore_if_locked("volume") {
            return;
        }
        self.controller.set_volume(volume);
        self.restart_hide(self.now());
    }

    /// Step the stored volume by `delta`
    pub fn adjust_volume(&mut self, delta: f64) {
        if self.ignore_if_locked("volume") {
            return;
        }
        self.controller.adjust_volume(delta);
        self.restart_hide(self.now());
    }

    pub fn toggle_mute(&mut self) {
        if self.ignore_if_locked("mute") {
            return;
        }
        self.controller.toggle_mute();
        self.restart_hide(self.now());
    }

    /// Pick a speed from the menu. Closes the menu on success.
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if self.ignore_if_locked("speed") {
            return Ok(());
        }
        self.controller.set_playback_rate(rate)?;
        self.menu = None;
        self.restart_hide(self.now());
        Ok(())
    }

    // =========================================================================
    // Menus, lock, brightness
    // =========================================================================

    /// Open `menu`, or close it if it is already open
    pub fn toggle_menu(&mut self, menu: Menu) {
        if self.ignore_if_locked("menu") {
            return;
        }
        self.menu = if self.menu == Some(menu) { None } else { Some(menu) };
        self.visibility.force_visible();
        self.restart_hide(self.now());
    }

    pub fn close_menus(&mut self) {
        if self.menu.take().is_some() {
            self.restart_hide(self.now());
        }
    }

    /// Toggle lock mode (fullscreen only). Returns the new lock state.
    #[instrument(skip(self), fields(surface = %self.config.kind))]
    pub fn toggle_lock(&mut self) -> bool {
        if self.config.kind != SurfaceKind::Fullscreen {
            return false;
        }
        self.locked = !self.locked;
        if self.locked {
            self.menu = None;
            self.gestures.reset();
            self.visibility.force_visible();
        } else {
            self.sync_visibility(self.now());
        }
        info!(locked = self.locked, "Lock toggled");
        self.locked
    }

    /// Step the overlay brightness filter (fullscreen only)
    pub fn cycle_brightness(&mut self) -> Brightness {
        if self.config.kind == SurfaceKind::Fullscreen && !self.ignore_if_locked("brightness") {
            self.brightness = self.brightness.next();
            self.restart_hide(self.now());
        }
        self.brightness
    }

    /// Drop overlay-only UI state (menus, lock, tap history, indicator)
    pub fn reset_overlay_ui(&mut self) {
        self.menu = None;
        self.locked = false;
        self.indicator = None;
        self.gestures.reset();
        self.visibility.force_visible();
    }

    // =========================================================================
    // Pointer, taps and keys
    // =========================================================================

    pub fn pointer_enter(&mut self) {
        if self.ignore_if_locked("pointer") {
            return;
        }
        let gate = self.gate();
        self.visibility.pointer_enter(self.now(), gate);
    }

    pub fn pointer_move(&mut self) {
        if self.ignore_if_locked("pointer") {
            return;
        }
        let gate = self.gate();
        self.visibility.pointer_move(self.now(), gate);
    }

    pub fn pointer_leave(&mut self) {
        if self.ignore_if_locked("pointer") {
            return;
        }
        let gate = self.gate();
        self.visibility.pointer_leave(self.now(), gate);
    }

    /// Tap or click on the video area
    pub fn tap(&mut self, x: f64, width: f64) -> TapOutcome {
        let now = self.now();

        if self.locked {
            self.visibility.show_briefly(now, self.config.lock_hint());
            return TapOutcome::LockHint;
        }
        if self.config.kind == SurfaceKind::Inline && !self.config.touch {
            return TapOutcome::Ignored;
        }

        match self.gestures.tap(Tap { at: now, x, width }) {
            Gesture::Pending => TapOutcome::Pending,
            Gesture::SingleTap => TapOutcome::ToggledControls {
                visible: self.toggle_controls(now),
            },
            Gesture::DoubleTap(zone) => {
                let intent = self.gestures.intent_for(zone);
                self.apply(intent);
                TapOutcome::Intent(intent)
            }
        }
    }

    fn apply(&mut self, intent: Intent) {
        match intent {
            Intent::SeekBy(delta) => self.seek_by(delta),
            Intent::TogglePlayPause => {
                self.toggle_play_pause();
            }
            Intent::ToggleControls => {
                self.toggle_controls(self.now());
            }
        }
    }

    fn toggle_controls(&mut self, now: Duration) -> bool {
        let visible = self.visibility.toggle();
        if !visible {
            self.menu = None;
        } else if self.controller.state().is_playing {
            self.visibility.defer_rearm(now);
        }
        visible
    }

    /// Keyboard shortcut (fullscreen only, ignored while locked)
    pub fn key(&mut self, key: Key) -> KeyOutcome {
        if self.config.kind != SurfaceKind::Fullscreen || self.locked {
            return KeyOutcome::Ignored;
        }

        let step = self.config.gesture.seek_step_secs;
        let volume_step = self.config.volume_step;
        match key {
            Key::Space | Key::K => {
                self.toggle_play_pause();
            }
            Key::Escape => return KeyOutcome::Close,
            Key::ArrowLeft => self.seek_by(-step),
            Key::ArrowRight => self.seek_by(step),
            Key::ArrowUp => self.adjust_volume(volume_step),
            Key::ArrowDown => self.adjust_volume(-volume_step),
            Key::M => self.toggle_mute(),
        }
        KeyOutcome::Handled
    }

    // =========================================================================
    // Notifications and scheduling
    // =========================================================================

    /// Forward a media notification
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let was_playing = self.controller.state().is_playing;
        self.controller.handle_event(event);

        match event {
            MediaEvent::Ended => self.visibility.force_visible(),
            MediaEvent::Play | MediaEvent::Pause | MediaEvent::PlayRejected => {
                if was_playing != self.controller.state().is_playing {
                    self.sync_visibility(self.now());
                }
            }
            _ => {}
        }
    }

    /// Muted start without viewer intent (viewport autoplay, hand-off)
    pub fn play_unattended(&mut self) -> bool {
        let started = self.controller.play_unattended();
        self.sync_visibility(self.now());
        started
    }

    /// Start playback keeping the current mute state (hand-off continuity).
    /// Refusal is absorbed.
    pub fn resume(&mut self) -> bool {
        let started = match self.controller.media_mut().play() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Resume refused");
                false
            }
        };
        self.controller.on_play_state_changed(started);
        self.sync_visibility(self.now());
        started
    }

    pub fn pause_silently(&mut self) {
        self.controller.pause_silently();
        self.sync_visibility(self.now());
    }

    /// Re-read the binding after another surface handed control back
    pub fn refresh_from_binding(&mut self) {
        self.controller.refresh_from_binding();
        self.sync_visibility(self.now());
    }

    /// Earliest pending deadline on this surface
    pub fn next_deadline(&self) -> Option<Duration> {
        [
            self.visibility.next_deadline(),
            self.gestures.next_deadline(),
            self.indicator.map(|i| i.visible_until),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Run a scheduling turn: fire every due timer in deadline order.
    ///
    /// Returns the number of timers fired.
    pub fn poll(&mut self) -> usize {
        let now = self.now();
        let mut fired = 0;

        while let Some(at) = self.next_deadline().filter(|at| *at <= now) {
            fired += 1;

            if self.visibility.next_deadline() == Some(at) {
                let gate = self.gate();
                if self.visibility.poll(at, gate) {
                    debug!(surface = %self.config.kind, "Controls hidden");
                    self.menu = None;
                }
            } else if self.gestures.next_deadline() == Some(at) {
                if self.gestures.poll(at) {
                    self.toggle_controls(at);
                }
            } else {
                self.indicator = None;
            }
        }
        fired
    }
}

impl<M: MediaBinding + std::fmt::Debug> std::fmt::Debug for PlayerSurface<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSurface")
            .field("kind", &self.config.kind)
            .field("controller", &self.controller)
            .field("visibility", &self.visibility)
            .field("menu", &self.menu)
            .field("locked", &self.locked)
            .finish()
    }
}
