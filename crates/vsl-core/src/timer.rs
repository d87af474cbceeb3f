//! Clocks and one-shot timers
//!
//! All player time is a [`Duration`] since the clock's origin. A [`Timer`] is
//! a single cancellable slot: arming it again replaces the old deadline, so a
//! scope can never hold two live deadlines.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock with millisecond resolution.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, at: Duration) {
        self.millis.fetch_max(at.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// One-shot timer slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending deadline and schedule a new one
    pub fn arm(&mut self, now: Duration, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Returns true if a deadline was pending
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn is_due(&self, now: Duration) -> bool {
        matches!(self.deadline, Some(d) if d <= now)
    }

    /// Disarm and return true if the deadline has passed
    pub fn fire(&mut self, now: Duration) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance_ms(250);
        assert_eq!(other.now(), Duration::from_millis(250));

        other.set(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(250));
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let mut timer = Timer::new();
        timer.arm(Duration::ZERO, Duration::from_millis(3000));
        timer.arm(Duration::from_millis(1000), Duration::from_millis(3000));

        assert_eq!(timer.deadline(), Some(Duration::from_millis(4000)));
        assert!(!timer.fire(Duration::from_millis(3000)));
        assert!(timer.fire(Duration::from_millis(4000)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancel() {
        let mut timer = Timer::new();
        assert!(!timer.cancel());
        timer.arm(Duration::ZERO, Duration::ZERO);
        assert!(timer.is_due(Duration::ZERO));
        assert!(timer.cancel());
        assert!(!timer.fire(Duration::from_secs(10)));
    }
}
