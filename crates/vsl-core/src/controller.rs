//! Playback controller - transport state for one player surface
//!
//! Owns the [`PlaybackState`] of a surface and mutates the media binding in
//! response to viewer intent. The binding stays the source of truth for
//! whether media is paused; notifications flow back in through the
//! `on_*` handlers.

use crate::{
    analytics::{AnalyticsEmitter, MilestoneTracker, VideoEventKind},
    media::{MediaBinding, MediaEvent},
    types::{percent_of, PlaybackRate, Side, VolumeLevel},
    Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Observable transport state of a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_muted: bool,
    /// Volume in [0, 1]
    pub volume: f64,
    /// Last non-zero volume, restored by unmute
    pub previous_volume: f64,
    /// Playhead in seconds
    pub current_time: f64,
    /// Duration in seconds, 0 until metadata loads
    pub duration: f64,
    /// Buffered end as a percentage of the duration
    pub buffered_fraction: f64,
    /// Playhead as a percentage of the duration
    pub progress_fraction: f64,
    pub playback_rate: PlaybackRate,
    /// The viewer started playback explicitly at least once
    pub has_started: bool,
}

impl PlaybackState {
    pub fn volume_level(&self) -> VolumeLevel {
        VolumeLevel::from_state(self.volume, self.is_muted)
    }
}

/// Result of a play/pause toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayToggle {
    Started,
    Paused,
    /// The platform refused to start playback
    Refused,
}

fn known_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

/// Transport controller over a media binding
pub struct PlaybackController<M: MediaBinding> {
    media: M,
    state: PlaybackState,
    milestones: MilestoneTracker,
    analytics: AnalyticsEmitter,
    default_volume: f64,
}

impl<M: MediaBinding> PlaybackController<M> {
    /// Create a controller seeded from the binding's current state
    pub fn new(media: M, analytics: AnalyticsEmitter, default_volume: f64) -> Self {
        let volume = media.volume().clamp(0.0, 1.0);
        let duration = known_duration(media.duration());
        let current_time = media.current_time().max(0.0);

        let state = PlaybackState {
            is_playing: !media.paused(),
            is_muted: media.muted() || volume == 0.0,
            volume,
            previous_volume: if volume > 0.0 { volume } else { default_volume },
            current_time,
            duration,
            buffered_fraction: 0.0,
            progress_fraction: percent_of(current_time, duration),
            playback_rate: PlaybackRate::try_from(media.playback_rate()).unwrap_or_default(),
            has_started: false,
        };

        Self {
            media,
            state,
            milestones: MilestoneTracker::new(),
            analytics,
            default_volume,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    /// Direct binding access for hosts that forward platform changes
    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn into_media(self) -> M {
        self.media
    }

    pub fn analytics(&self) -> &AnalyticsEmitter {
        &self.analytics
    }

    /// Milestones already reported this viewing
    pub fn milestones_fired(&self) -> Vec<u8> {
        self.milestones.fired().collect()
    }

    pub fn milestones(&self) -> &MilestoneTracker {
        &self.milestones
    }

    /// Continue a viewing started on another surface
    pub fn adopt_milestones(&mut self, tracker: MilestoneTracker) {
        self.milestones = tracker;
    }

    pub(crate) fn emit(&self, kind: VideoEventKind) {
        let mut duration = known_duration(self.media.duration());
        if duration == 0.0 {
            duration = self.state.duration;
        }
        self.analytics.emit(kind, self.media.current_time(), duration);
    }

    /// Show a duration learned elsewhere until the binding reports its own
    pub fn assume_duration(&mut self, duration: f64) {
        if self.state.duration == 0.0 {
            self.state.duration = known_duration(duration);
            self.state.progress_fraction = percent_of(self.state.current_time, self.state.duration);
        }
    }

    /// Start or pause depending on the binding's paused flag
    #[instrument(skip(self))]
    pub fn toggle_play_pause(&mut self) -> PlayToggle {
        if self.media.paused() {
            match self.media.play() {
                Ok(()) => {
                    self.state.is_playing = true;
                    self.state.has_started = true;
                    info!(position = self.media.current_time(), "Playback started");
                    self.emit(VideoEventKind::Play);
                    PlayToggle::Started
                }
                Err(e) => {
                    warn!(error = %e, "Play request refused");
                    self.state.is_playing = false;
                    PlayToggle::Refused
                }
            }
        } else {
            self.media.pause();
            self.state.is_playing = false;
            info!(position = self.media.current_time(), "Playback paused");
            self.emit(VideoEventKind::Pause);
            PlayToggle::Paused
        }
    }

    /// Muted unattended start, e.g. when scrolled into view.
    ///
    /// Returns false when the platform refuses.
    pub fn play_unattended(&mut self) -> bool {
        self.media.set_muted(true);
        self.state.is_muted = true;

        match self.media.play() {
            Ok(()) => {
                self.state.is_playing = true;
                debug!("Unattended playback started");
                true
            }
            Err(e) => {
                debug!(error = %e, "Autoplay prevented");
                self.state.is_playing = false;
                false
            }
        }
    }

    /// Pause without reporting it as a viewer action
    pub fn pause_silently(&mut self) {
        self.media.pause();
        self.state.is_playing = false;
    }

    /// Skip relative to the playhead, clamped to the media.
    ///
    /// Returns the side the seek indicator belongs on.
    #[instrument(skip(self))]
    pub fn seek_by(&mut self, delta: f64) -> Side {
        let side = if delta > 0.0 { Side::Right } else { Side::Left };
        let target = self.media.current_time() + delta;
        self.seek_to(target);
        side
    }

    /// Seek to a fraction of the duration (progress bar)
    #[instrument(skip(self))]
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        let duration = known_duration(self.media.duration());
        self.seek_to(fraction * duration);
    }

    fn seek_to(&mut self, target: f64) {
        let duration = known_duration(self.media.duration());
        if duration == 0.0 || !target.is_finite() {
            debug!("Seek ignored, duration unknown");
            return;
        }

        let from = self.media.current_time();
        let to = target.clamp(0.0, duration);
        self.media.set_current_time(to);

        self.state.current_time = to;
        self.state.duration = duration;
        self.state.progress_fraction = percent_of(to, duration);

        debug!(from, to, "Seek");
        self.emit(VideoEventKind::Seek { from, to });
    }

    /// Set volume, clamped to [0, 1]. Zero mutes, anything else unmutes.
    #[instrument(skip(self))]
    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        let muted = volume == 0.0;

        self.media.set_volume(volume);
        self.media.set_muted(muted);

        self.state.volume = volume;
        self.state.is_muted = muted;
        if !muted {
            self.state.previous_volume = volume;
        }

        self.emit(VideoEventKind::VolumeChange { volume });
    }

    /// Step the volume from its stored value
    pub fn adjust_volume(&mut self, delta: f64) {
        self.set_volume(self.state.volume + delta);
    }

    /// Mute, or restore the last audible volume
    #[instrument(skip(self))]
    pub fn toggle_mute(&mut self) {
        if self.state.is_muted || self.state.volume == 0.0 {
            let restore = if self.state.previous_volume > 0.0 {
                self.state.previous_volume
            } else {
                self.default_volume
            };
            self.media.set_volume(restore);
            self.media.set_muted(false);
            self.state.volume = restore;
            self.state.is_muted = false;
        } else {
            self.state.previous_volume = self.state.volume;
            self.media.set_muted(true);
            self.state.is_muted = true;
        }
    }

    /// Change speed; rates outside the menu are rejected without effect
    #[instrument(skip(self))]
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        let rate = PlaybackRate::try_from(rate)?;
        self.media.set_playback_rate(rate.as_f64());
        self.state.playback_rate = rate;
        info!(rate = %rate, "Playback rate changed");
        Ok(())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Dispatch a binding notification
    pub fn handle_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate => self.on_time_update(),
            MediaEvent::Progress => self.on_buffer_progress(),
            MediaEvent::MetadataLoaded => self.on_metadata_loaded(),
            MediaEvent::Play => self.on_play_state_changed(true),
            MediaEvent::Pause => self.on_play_state_changed(false),
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::PlayRejected => self.on_play_rejected(),
        }
    }

    pub fn on_time_update(&mut self) {
        let current = self.media.current_time();
        let reported = known_duration(self.media.duration());
        if reported > 0.0 {
            self.state.duration = reported;
        }
        let duration = self.state.duration;

        self.state.current_time = current;
        self.state.progress_fraction = percent_of(current, duration);

        for milestone in self.milestones.crossed(current, duration) {
            info!(milestone, "Progress milestone");
            self.emit(VideoEventKind::Progress { milestone });
        }
    }

    pub fn on_buffer_progress(&mut self) {
        if let Some(end) = self.media.buffered_end() {
            let duration = known_duration(self.media.duration());
            self.state.buffered_fraction = percent_of(end, duration);
        }
    }

    pub fn on_metadata_loaded(&mut self) {
        self.state.duration = known_duration(self.media.duration());
        self.state.progress_fraction = percent_of(self.state.current_time, self.state.duration);
        debug!(duration = self.state.duration, "Metadata loaded");
    }

    pub fn on_ended(&mut self) {
        self.state.is_playing = false;
        info!("Playback complete");
        self.emit(VideoEventKind::Complete);
        self.milestones.reset();
    }

    pub fn on_play_state_changed(&mut self, playing: bool) {
        self.state.is_playing = playing;
    }

    pub fn on_play_rejected(&mut self) {
        debug!("Play rejected after request");
        self.state.is_playing = false;
    }

    /// Re-read everything from the binding
    pub fn refresh_from_binding(&mut self) {
        let volume = self.media.volume().clamp(0.0, 1.0);
        let duration = known_duration(self.media.duration());
        let current = self.media.current_time().max(0.0);

        self.state.is_playing = !self.media.paused();
        self.state.current_time = current;
        self.state.duration = duration;
        self.state.progress_fraction = percent_of(current, duration);
        self.state.volume = volume;
        self.state.is_muted = self.media.muted() || volume == 0.0;
        if volume > 0.0 {
            self.state.previous_volume = volume;
        }
        if let Ok(rate) = PlaybackRate::try_from(self.media.playback_rate()) {
            self.state.playback_rate = rate;
        }
        self.on_buffer_progress();
    }
}

impl<M: MediaBinding + std::fmt::Debug> std::fmt::Debug for PlaybackController<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("media", &self.media)
            .field("state", &self.state)
            .finish()
    }
}
