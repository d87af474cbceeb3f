//! Fullscreen hand-off between the inline player and the overlay
//!
//! ```text
//!  inline binding                              overlay binding
//!  ┌────────────┐   open: snapshot ──────────▶ ┌────────────┐
//!  │  paused    │         pause inline         │  playing   │
//!  └────────────┘   close: ◀────────── snapshot└────────────┘
//!                          pause overlay
//! ```
//!
//! Both transitions run inside a single call so nothing observes a half
//! copied state. The orientation lock and scroll suppression are held by a
//! [`ScreenLease`] that is released on close or when the hand-off is dropped.

use crate::{
    analytics::{AnalyticsEmitter, FullscreenAction, VideoEventKind},
    media::MediaBinding,
    surface::PlayerSurface,
    timer::Clock,
    types::{PlaybackRate, SurfaceConfig},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Playback settings copied between bindings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    pub current_time: f64,
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
}

impl MediaSnapshot {
    pub fn capture<M: MediaBinding + ?Sized>(media: &M) -> Self {
        Self {
            current_time: media.current_time(),
            volume: media.volume(),
            muted: media.muted(),
            playback_rate: media.playback_rate(),
        }
    }

    /// Write the snapshot to `media`. Unsupported rates fall back to normal speed.
    pub fn apply_to<M: MediaBinding + ?Sized>(&self, media: &mut M) {
        media.set_current_time(self.current_time);
        media.set_volume(self.volume);
        media.set_muted(self.muted);
        let rate = PlaybackRate::try_from(self.playback_rate).unwrap_or_default();
        media.set_playback_rate(rate.as_f64());
    }
}

/// Page-level side effects of going fullscreen
pub trait ScreenEnvironment: Send {
    /// Lock the screen to landscape. Platforms may refuse.
    fn lock_orientation(&mut self) -> Result<()>;
    fn unlock_orientation(&mut self);
    fn suppress_scroll(&mut self);
    fn restore_scroll(&mut self);
}

/// Screen environment with no side effects
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScreen;

impl ScreenEnvironment for NoopScreen {
    fn lock_orientation(&mut self) -> Result<()> {
        Ok(())
    }
    fn unlock_orientation(&mut self) {}
    fn suppress_scroll(&mut self) {}
    fn restore_scroll(&mut self) {}
}

/// Screen environment that refuses the orientation lock, for desktop hosts
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopScreen;

impl ScreenEnvironment for DesktopScreen {
    fn lock_orientation(&mut self) -> Result<()> {
        Err(Error::OrientationLockRefused("not supported on desktop".into()))
    }
    fn unlock_orientation(&mut self) {}
    fn suppress_scroll(&mut self) {
        debug!("Page scroll suppressed");
    }
    fn restore_scroll(&mut self) {
        debug!("Page scroll restored");
    }
}

/// Held orientation lock and scroll suppression, released on drop
pub struct ScreenLease {
    screen: Box<dyn ScreenEnvironment>,
    orientation_locked: bool,
}

impl ScreenLease {
    pub fn acquire(mut screen: Box<dyn ScreenEnvironment>) -> Self {
        screen.suppress_scroll();
        let orientation_locked = match screen.lock_orientation() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Orientation lock refused");
                false
            }
        };
        Self {
            screen,
            orientation_locked,
        }
    }

    pub fn orientation_locked(&self) -> bool {
        self.orientation_locked
    }

    /// Release now instead of at drop
    pub fn release(self) {}
}

impl Drop for ScreenLease {
    fn drop(&mut self) {
        self.screen.restore_scroll();
        if self.orientation_locked {
            self.screen.unlock_orientation();
        }
        debug!("Screen lease released");
    }
}

impl std::fmt::Debug for ScreenLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenLease")
            .field("orientation_locked", &self.orientation_locked)
            .finish()
    }
}

/// An open fullscreen overlay
pub struct FullscreenHandoff<M: MediaBinding> {
    overlay: PlayerSurface<M>,
    lease: ScreenLease,
}

impl<M: MediaBinding> FullscreenHandoff<M> {
    /// Move playback from `inline` to a new overlay over `overlay_media`.
    ///
    /// The inline binding is always paused; the overlay starts only if the
    /// inline player was playing.
    #[instrument(skip_all)]
    pub fn open<I: MediaBinding>(
        inline: &mut PlayerSurface<I>,
        mut overlay_media: M,
        config: SurfaceConfig,
        analytics: AnalyticsEmitter,
        clock: Arc<dyn Clock>,
        screen: Box<dyn ScreenEnvironment>,
    ) -> Self {
        let snapshot = MediaSnapshot::capture(inline.media());
        let was_playing = !inline.media().paused();
        let inline_duration = inline.state().duration;

        snapshot.apply_to(&mut overlay_media);
        inline.pause_silently();

        let mut overlay = PlayerSurface::new(overlay_media, config, analytics, clock);
        overlay.controller_mut().assume_duration(inline_duration);
        overlay
            .controller_mut()
            .adopt_milestones(inline.controller().milestones().clone());
        if was_playing {
            overlay.resume();
        }

        let lease = ScreenLease::acquire(screen);
        overlay
            .controller()
            .emit(VideoEventKind::Fullscreen { action: FullscreenAction::Open });
        info!(
            position = snapshot.current_time,
            playing = overlay.state().is_playing,
            "Fullscreen opened"
        );

        Self { overlay, lease }
    }

    pub fn overlay(&self) -> &PlayerSurface<M> {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut PlayerSurface<M> {
        &mut self.overlay
    }

    pub fn lease(&self) -> &ScreenLease {
        &self.lease
    }

    /// Hand playback back to `inline` and return the overlay binding.
    ///
    /// The inline player is left paused at the overlay's position.
    #[instrument(skip_all)]
    pub fn close<I: MediaBinding>(self, inline: &mut PlayerSurface<I>) -> M {
        let Self { mut overlay, lease } = self;

        let snapshot = MediaSnapshot::capture(overlay.media());
        overlay.pause_silently();
        overlay.reset_overlay_ui();

        snapshot.apply_to(inline.media_mut());
        inline
            .controller_mut()
            .adopt_milestones(overlay.controller().milestones().clone());
        inline.refresh_from_binding();

        overlay
            .controller()
            .emit(VideoEventKind::Fullscreen { action: FullscreenAction::Close });
        lease.release();
        info!(position = snapshot.current_time, "Fullscreen closed");

        overlay.into_media()
    }
}

impl<M: MediaBinding + std::fmt::Debug> std::fmt::Debug for FullscreenHandoff<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullscreenHandoff")
            .field("overlay", &self.overlay)
            .field("lease", &self.lease)
            .finish()
    }
}
