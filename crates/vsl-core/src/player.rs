//! Player facade
//!
//! [`VslPlayer`] owns the inline surface and, while it is open, the
//! fullscreen hand-off. Viewer input is routed to whichever surface is on
//! top; media notifications are routed by the surface that produced them.

use crate::{
    analytics::{AnalyticsEmitter, AnalyticsSink},
    controller::PlayToggle,
    handoff::{FullscreenHandoff, ScreenEnvironment},
    media::{MediaBinding, MediaEvent},
    surface::{Key, KeyOutcome, PlayerSurface, SurfaceSnapshot, TapOutcome},
    timer::Clock,
    types::{Brightness, Menu, PlayerConfig, SurfaceKind},
    Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// State of both surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub inline: SurfaceSnapshot,
    pub fullscreen: Option<SurfaceSnapshot>,
}

/// Inline player with an optional fullscreen overlay
pub struct VslPlayer<M: MediaBinding> {
    config: PlayerConfig,
    inline: PlayerSurface<M>,
    fullscreen: Option<FullscreenHandoff<M>>,
    analytics: AnalyticsEmitter,
    clock: Arc<dyn Clock>,
}

impl<M: MediaBinding> VslPlayer<M> {
    /// Build a player over the inline media binding
    pub fn new(
        media: M,
        config: PlayerConfig,
        sink: Arc<dyn AnalyticsSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let analytics = if config.analytics_enabled {
            AnalyticsEmitter::new(config.video_name.clone(), sink)
        } else {
            AnalyticsEmitter::disabled()
        };
        // A fresh player starts at the configured volume, not the platform's
        let mut media = media;
        media.set_volume(config.inline.default_volume);
        let inline = PlayerSurface::new(media, config.inline.clone(), analytics.clone(), clock.clone());

        info!(
            video = %config.video_name,
            session = %analytics.session_id(),
            "Player created"
        );

        Ok(Self {
            config,
            inline,
            fullscreen: None,
            analytics,
            clock,
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn analytics(&self) -> &AnalyticsEmitter {
        &self.analytics
    }

    pub fn inline(&self) -> &PlayerSurface<M> {
        &self.inline
    }

    pub fn inline_mut(&mut self) -> &mut PlayerSurface<M> {
        &mut self.inline
    }

    pub fn fullscreen(&self) -> Option<&PlayerSurface<M>> {
        self.fullscreen.as_ref().map(|h| h.overlay())
    }

    pub fn fullscreen_mut(&mut self) -> Option<&mut PlayerSurface<M>> {
        self.fullscreen.as_mut().map(|h| h.overlay_mut())
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_some()
    }

    /// The surface receiving viewer input
    pub fn active(&self) -> &PlayerSurface<M> {
        match &self.fullscreen {
            Some(handoff) => handoff.overlay(),
            None => &self.inline,
        }
    }

    pub fn active_mut(&mut self) -> &mut PlayerSurface<M> {
        match &mut self.fullscreen {
            Some(handoff) => handoff.overlay_mut(),
            None => &mut self.inline,
        }
    }

    /// Surface of the given kind, if it exists right now
    pub fn surface_mut(&mut self, kind: SurfaceKind) -> Option<&mut PlayerSurface<M>> {
        match kind {
            SurfaceKind::Inline => Some(&mut self.inline),
            SurfaceKind::Fullscreen => self.fullscreen_mut(),
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            inline: self.inline.snapshot(),
            fullscreen: self.fullscreen().map(|s| s.snapshot()),
        }
    }

    // =========================================================================
    // Fullscreen
    // =========================================================================

    /// Open the overlay over `overlay_media`. Does nothing if already open.
    pub fn open_fullscreen(&mut self, overlay_media: M, screen: Box<dyn ScreenEnvironment>) -> bool {
        if self.fullscreen.is_some() {
            debug!("Fullscreen already open");
            return false;
        }
        self.fullscreen = Some(FullscreenHandoff::open(
            &mut self.inline,
            overlay_media,
            self.config.fullscreen.clone(),
            self.analytics.clone(),
            self.clock.clone(),
            screen,
        ));
        true
    }

    /// Close the overlay and return its binding
    pub fn close_fullscreen(&mut self) -> Option<M> {
        let handoff = self.fullscreen.take()?;
        Some(handoff.close(&mut self.inline))
    }

    // =========================================================================
    // Input routed to the active surface
    // =========================================================================

    pub fn tap(&mut self, x: f64, width: f64) -> TapOutcome {
        self.active_mut().tap(x, width)
    }

    /// Keyboard shortcut. Escape on the overlay closes it.
    pub fn key(&mut self, key: Key) -> KeyOutcome {
        let outcome = self.active_mut().key(key);
        if outcome == KeyOutcome::Close {
            self.close_fullscreen();
        }
        outcome
    }

    pub fn pointer_enter(&mut self) {
        self.active_mut().pointer_enter();
    }

    pub fn pointer_move(&mut self) {
        self.active_mut().pointer_move();
    }

    pub fn pointer_leave(&mut self) {
        self.active_mut().pointer_leave();
    }

    pub fn toggle_play_pause(&mut self) -> Option<PlayToggle> {
        self.active_mut().toggle_play_pause()
    }

    pub fn seek_by(&mut self, delta: f64) {
        self.active_mut().seek_by(delta);
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) {
        self.active_mut().seek_to_fraction(fraction);
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.active_mut().set_volume(volume);
    }

    pub fn toggle_mute(&mut self) {
        self.active_mut().toggle_mute();
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.active_mut().set_playback_rate(rate)
    }

    pub fn toggle_menu(&mut self, menu: Menu) {
        self.active_mut().toggle_menu(menu);
    }

    pub fn toggle_lock(&mut self) -> bool {
        self.active_mut().toggle_lock()
    }

    pub fn cycle_brightness(&mut self) -> Brightness {
        self.active_mut().cycle_brightness()
    }

    // =========================================================================
    // Notifications and scheduling
    // =========================================================================

    /// Forward a notification from the binding behind `source`.
    ///
    /// Notifications for an overlay that has already closed are dropped.
    pub fn handle_media_event(&mut self, source: SurfaceKind, event: MediaEvent) {
        match self.surface_mut(source) {
            Some(surface) => surface.handle_media_event(event),
            None => debug!(?event, "Notification for closed overlay dropped"),
        }
    }

    /// Visible fraction of the inline player changed
    pub fn on_viewport_visibility(&mut self, ratio: f64) {
        if !self.config.autoplay_on_scroll {
            return;
        }

        if ratio > 0.0 && ratio >= self.config.autoplay_visibility_threshold {
            if self.fullscreen.is_none()
                && self.inline.media().paused()
                && !self.inline.state().has_started
            {
                debug!(ratio, "Player in view, starting muted");
                self.inline.play_unattended();
            }
        } else if !self.inline.media().paused() && self.fullscreen.is_none() {
            debug!(ratio, "Player out of view, pausing");
            self.inline.pause_silently();
        }
    }

    /// Run a scheduling turn on both surfaces
    pub fn poll(&mut self) -> usize {
        let mut fired = self.inline.poll();
        if let Some(overlay) = self.fullscreen_mut() {
            fired += overlay.poll();
        }
        fired
    }
}

impl<M: MediaBinding + std::fmt::Debug> std::fmt::Debug for VslPlayer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VslPlayer")
            .field("video_name", &self.config.video_name)
            .field("inline", &self.inline)
            .field("fullscreen", &self.fullscreen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{MemorySink, VideoEventKind};
    use crate::handoff::NoopScreen;
    use crate::media::{AutoplayPolicy, SimulatedMedia};
    use crate::timer::ManualClock;

    fn player(config: PlayerConfig, media: SimulatedMedia) -> (VslPlayer<SimulatedMedia>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let player = VslPlayer::new(media, config, sink.clone(), Arc::new(ManualClock::new())).unwrap();
        (player, sink)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PlayerConfig {
            autoplay_visibility_threshold: 1.5,
            ..Default::default()
        };
        let result = VslPlayer::new(
            SimulatedMedia::loaded(10.0),
            config,
            Arc::new(MemorySink::new()),
            Arc::new(ManualClock::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_viewport_autoplay_starts_muted_once() {
        let (mut p, sink) = player(PlayerConfig::mobile(), SimulatedMedia::loaded(60.0));

        p.on_viewport_visibility(0.6);
        assert!(p.inline().state().is_playing);
        assert!(p.inline().state().is_muted);
        assert!(!p.inline().state().has_started);
        assert!(sink.events().is_empty());

        p.on_viewport_visibility(0.2);
        assert!(!p.inline().state().is_playing);

        p.on_viewport_visibility(0.9);
        assert!(p.inline().state().is_playing);
    }

    #[test]
    fn test_viewport_autoplay_respects_started_and_refusal() {
        let (mut p, _) = player(PlayerConfig::mobile(), SimulatedMedia::loaded(60.0));
        p.toggle_play_pause();
        p.toggle_play_pause();
        p.on_viewport_visibility(1.0);
        assert!(!p.inline().state().is_playing);

        let media = SimulatedMedia::loaded(60.0).with_policy(AutoplayPolicy::Deny);
        let (mut p, _) = player(PlayerConfig::mobile(), media);
        p.on_viewport_visibility(1.0);
        assert!(!p.inline().state().is_playing);
    }

    #[test]
    fn test_viewport_disabled() {
        let config = PlayerConfig {
            autoplay_on_scroll: false,
            ..PlayerConfig::mobile()
        };
        let (mut p, _) = player(config, SimulatedMedia::loaded(60.0));
        p.on_viewport_visibility(1.0);
        assert!(!p.inline().state().is_playing);
    }

    #[test]
    fn test_scrolling_away_keeps_fullscreen_playing() {
        let (mut p, _) = player(PlayerConfig::mobile(), SimulatedMedia::loaded(60.0));
        p.toggle_play_pause();
        p.open_fullscreen(SimulatedMedia::loaded(60.0), Box::new(NoopScreen));
        p.on_viewport_visibility(0.0);
        assert!(p.fullscreen().unwrap().state().is_playing);
    }

    #[test]
    fn test_scrolling_back_into_view_keeps_inline_paused_under_overlay() {
        let (mut p, _) = player(PlayerConfig::mobile(), SimulatedMedia::loaded(60.0));
        p.on_viewport_visibility(0.6);
        assert!(p.inline().state().is_playing);

        p.open_fullscreen(SimulatedMedia::loaded(60.0), Box::new(NoopScreen));
        p.on_viewport_visibility(0.2);
        p.on_viewport_visibility(0.7);

        assert!(p.fullscreen().unwrap().state().is_playing);
        assert!(!p.inline().state().is_playing);
        assert!(p.inline().media().paused());
    }

    #[test]
    fn test_unmute_after_autoplay_restores_default_volume() {
        let (mut p, _) = player(PlayerConfig::mobile(), SimulatedMedia::loaded(60.0));
        assert_eq!(p.inline().state().volume, 0.7);
        assert_eq!(p.inline().state().previous_volume, 0.7);

        p.on_viewport_visibility(0.6);
        assert!(p.inline().state().is_muted);

        p.toggle_mute();
        assert!(!p.inline().state().is_muted);
        assert_eq!(p.inline().state().volume, 0.7);
        assert_eq!(p.inline().media().volume(), 0.7);
    }

    #[test]
    fn test_input_routes_to_overlay_and_escape_closes() {
        let (mut p, sink) = player(PlayerConfig::mobile(), SimulatedMedia::loaded(60.0));
        assert!(p.open_fullscreen(SimulatedMedia::loaded(60.0), Box::new(NoopScreen)));
        assert!(!p.open_fullscreen(SimulatedMedia::loaded(60.0), Box::new(NoopScreen)));

        p.seek_by(10.0);
        assert_eq!(p.active().kind(), SurfaceKind::Fullscreen);
        assert_eq!(p.fullscreen().unwrap().state().current_time, 10.0);
        assert_eq!(p.inline().state().current_time, 0.0);

        assert_eq!(p.key(Key::Escape), KeyOutcome::Close);
        assert!(!p.is_fullscreen());
        assert_eq!(p.inline().state().current_time, 10.0);
        assert_eq!(
            sink.kinds().last(),
            Some(&VideoEventKind::Fullscreen {
                action: crate::analytics::FullscreenAction::Close
            })
        );
    }

    #[test]
    fn test_disabled_analytics() {
        let config = PlayerConfig {
            analytics_enabled: false,
            ..Default::default()
        };
        let (mut p, sink) = player(config, SimulatedMedia::loaded(60.0));
        p.toggle_play_pause();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_events_for_closed_overlay_dropped() {
        let (mut p, _) = player(PlayerConfig::mobile(), SimulatedMedia::loaded(60.0));
        p.handle_media_event(SurfaceKind::Fullscreen, MediaEvent::Ended);
        assert!(!p.inline().state().is_playing);
    }
}
