//! Media binding - the platform's playable media handle
//!
//! The player never owns decoding or delivery. It drives a [`MediaBinding`]
//! and reacts to the [`MediaEvent`] notifications the host forwards from it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Control surface of a native media element
pub trait MediaBinding {
    /// Request playback. The platform may refuse (autoplay policy).
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, time: f64);
    /// Media duration in seconds; 0 or NaN until metadata has loaded
    fn duration(&self) -> f64;
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    /// End of the last buffered range, if anything is buffered
    fn buffered_end(&self) -> Option<f64>;
}

impl<M: MediaBinding + ?Sized> MediaBinding for Box<M> {
    fn play(&mut self) -> Result<()> {
        (**self).play()
    }
    fn pause(&mut self) {
        (**self).pause()
    }
    fn paused(&self) -> bool {
        (**self).paused()
    }
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }
    fn set_current_time(&mut self, time: f64) {
        (**self).set_current_time(time)
    }
    fn duration(&self) -> f64 {
        (**self).duration()
    }
    fn volume(&self) -> f64 {
        (**self).volume()
    }
    fn set_volume(&mut self, volume: f64) {
        (**self).set_volume(volume)
    }
    fn muted(&self) -> bool {
        (**self).muted()
    }
    fn set_muted(&mut self, muted: bool) {
        (**self).set_muted(muted)
    }
    fn playback_rate(&self) -> f64 {
        (**self).playback_rate()
    }
    fn set_playback_rate(&mut self, rate: f64) {
        (**self).set_playback_rate(rate)
    }
    fn buffered_end(&self) -> Option<f64> {
        (**self).buffered_end()
    }
}

/// Notifications emitted by a media binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaEvent {
    TimeUpdate,
    Progress,
    MetadataLoaded,
    Play,
    Pause,
    Ended,
    /// A play request was refused after the fact
    PlayRejected,
}

/// What the simulated platform allows `play()` to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayPolicy {
    #[default]
    Allow,
    /// Only muted playback may start
    MutedOnly,
    Deny,
}

/// Headless media element for tests and scenario replay
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    paused: bool,
    current_time: f64,
    duration: f64,
    metadata_loaded: bool,
    volume: f64,
    muted: bool,
    playback_rate: f64,
    buffered_end: Option<f64>,
    /// Seconds buffered ahead of the playhead on each advance
    buffer_ahead: f64,
    policy: AutoplayPolicy,
    pending: Vec<MediaEvent>,
}

impl SimulatedMedia {
    /// Media whose metadata has not loaded yet
    pub fn new(duration: f64) -> Self {
        Self {
            paused: true,
            current_time: 0.0,
            duration,
            metadata_loaded: false,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            buffered_end: None,
            buffer_ahead: 30.0,
            policy: AutoplayPolicy::Allow,
            pending: Vec::new(),
        }
    }

    /// Media with metadata already available
    pub fn loaded(duration: f64) -> Self {
        let mut media = Self::new(duration);
        media.metadata_loaded = true;
        media
    }

    pub fn with_policy(mut self, policy: AutoplayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: AutoplayPolicy) {
        self.policy = policy;
    }

    pub fn with_buffer_ahead(mut self, seconds: f64) -> Self {
        self.buffer_ahead = seconds.max(0.0);
        self
    }

    /// Finish loading metadata
    pub fn load_metadata(&mut self) -> Vec<MediaEvent> {
        if !self.metadata_loaded {
            self.metadata_loaded = true;
            self.pending.push(MediaEvent::MetadataLoaded);
        }
        self.drain_events()
    }

    /// Play for `elapsed` seconds of wall time and collect notifications
    pub fn advance(&mut self, elapsed: f64) -> Vec<MediaEvent> {
        if !self.paused && self.metadata_loaded && elapsed > 0.0 {
            let target = self.current_time + elapsed * self.playback_rate;
            self.current_time = target.min(self.duration);
            self.pending.push(MediaEvent::TimeUpdate);

            let buffered = (self.current_time + self.buffer_ahead).min(self.duration);
            if self.buffered_end.map_or(true, |end| buffered > end) {
                self.buffered_end = Some(buffered);
                self.pending.push(MediaEvent::Progress);
            }

            if self.current_time >= self.duration {
                self.paused = true;
                self.pending.push(MediaEvent::Pause);
                self.pending.push(MediaEvent::Ended);
            }
        }
        self.drain_events()
    }

    /// Take queued notifications
    pub fn drain_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl MediaBinding for SimulatedMedia {
    fn play(&mut self) -> Result<()> {
        let refused = match self.policy {
            AutoplayPolicy::Allow => false,
            AutoplayPolicy::MutedOnly => !self.muted,
            AutoplayPolicy::Deny => true,
        };
        if refused {
            debug!(policy = ?self.policy, "Simulated play refused");
            return Err(Error::PlaybackRefused(format!("{:?} policy", self.policy)));
        }

        if self.paused {
            self.paused = false;
            if self.metadata_loaded && self.current_time >= self.duration {
                self.current_time = 0.0;
            }
            self.pending.push(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.pending.push(MediaEvent::Pause);
        }
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        let upper = if self.metadata_loaded { self.duration } else { 0.0 };
        self.current_time = time.clamp(0.0, upper.max(0.0));
        self.pending.push(MediaEvent::TimeUpdate);
    }

    fn duration(&self) -> f64 {
        if self.metadata_loaded {
            self.duration
        } else {
            f64::NAN
        }
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = rate;
    }

    fn buffered_end(&self) -> Option<f64> {
        self.buffered_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_unknown_until_metadata() {
        let mut media = SimulatedMedia::new(120.0);
        assert!(media.duration().is_nan());
        assert_eq!(media.load_metadata(), vec![MediaEvent::MetadataLoaded]);
        assert_eq!(media.duration(), 120.0);
        assert!(media.load_metadata().is_empty());
    }

    #[test]
    fn test_advance_respects_rate_and_ends() {
        let mut media = SimulatedMedia::loaded(10.0);
        media.set_playback_rate(2.0);
        media.play().unwrap();
        media.drain_events();

        let events = media.advance(2.0);
        assert_eq!(media.current_time(), 4.0);
        assert!(events.contains(&MediaEvent::TimeUpdate));
        assert!(events.contains(&MediaEvent::Progress));

        let events = media.advance(10.0);
        assert_eq!(media.current_time(), 10.0);
        assert!(media.paused());
        assert_eq!(events.last(), Some(&MediaEvent::Ended));
    }

    #[test]
    fn test_muted_only_policy() {
        let mut media = SimulatedMedia::loaded(10.0).with_policy(AutoplayPolicy::MutedOnly);
        assert!(media.play().is_err());
        assert!(media.paused());

        media.set_muted(true);
        assert!(media.play().is_ok());
        assert!(!media.paused());
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut media = SimulatedMedia::loaded(60.0);
        media.set_current_time(90.0);
        assert_eq!(media.current_time(), 60.0);
        media.set_current_time(f64::NAN);
        assert_eq!(media.current_time(), 60.0);
    }
}
