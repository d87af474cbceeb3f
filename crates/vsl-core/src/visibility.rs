//! Control visibility - when on-screen controls auto-hide
//!
//! ```text
//!            qualifying input (playing, unlocked, no menu)
//!   Visible ───────────────────────────────────────────▶ AutoHiding(deadline)
//!      ▲  ◀──────── pause / end / lock (cancel) ──────────────┘   │
//!      │                                                           │ deadline
//!      └──────────── input / tap ─────────── Hidden ◀──────────────┘
//! ```

use crate::timer::Timer;
use crate::types::{SurfaceConfig, SurfaceKind};
use std::time::Duration;
use tracing::debug;

/// Current visibility phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityPhase {
    Visible,
    AutoHiding { deadline: Duration },
    Hidden,
}

/// Conditions under which a hide may be scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HideGate {
    pub playing: bool,
    pub menu_open: bool,
    pub locked: bool,
}

impl HideGate {
    pub fn allows_hide(&self) -> bool {
        self.playing && !self.menu_open && !self.locked
    }
}

/// Visibility state machine for one surface
#[derive(Debug, Clone)]
pub struct ControlVisibility {
    visible: bool,
    hide: Timer,
    /// Deferred re-arm, fired on the next scheduling turn
    rearm: Timer,
    hovering: bool,
    touch: bool,
    hover_persists: bool,
    hide_delay: Duration,
    leave_delay: Duration,
}

impl ControlVisibility {
    pub fn new(config: &SurfaceConfig) -> Self {
        Self {
            visible: true,
            hide: Timer::new(),
            rearm: Timer::new(),
            hovering: false,
            touch: config.touch,
            hover_persists: config.kind == SurfaceKind::Inline && !config.touch,
            hide_delay: config.hide_delay(),
            leave_delay: config.pointer_leave_delay(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub fn phase(&self) -> VisibilityPhase {
        match (self.visible, self.hide.deadline()) {
            (false, _) => VisibilityPhase::Hidden,
            (true, Some(deadline)) => VisibilityPhase::AutoHiding { deadline },
            (true, None) => VisibilityPhase::Visible,
        }
    }

    /// Pending hide deadline, if any
    pub fn hide_deadline(&self) -> Option<Duration> {
        self.hide.deadline()
    }

    pub fn rearm_pending(&self) -> bool {
        self.rearm.is_armed()
    }

    /// Earliest deadline this scope is waiting for
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.hide.deadline(), self.rearm.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Qualifying input: show, then schedule a fresh hide if allowed
    pub fn on_input(&mut self, now: Duration, gate: HideGate) {
        self.visible = true;
        self.schedule_hide(now, gate);
    }

    /// Cancel the pending hide and schedule a fresh one if allowed.
    /// Visibility itself is left alone.
    pub fn schedule_hide(&mut self, now: Duration, gate: HideGate) {
        self.hide.cancel();
        if gate.allows_hide() {
            self.hide.arm(now, self.hide_delay);
        }
    }

    /// Show and cancel everything pending, no re-arm
    pub fn force_visible(&mut self) {
        self.hide.cancel();
        self.rearm.cancel();
        self.visible = true;
    }

    /// Hide immediately
    pub fn hide(&mut self) {
        self.hide.cancel();
        self.rearm.cancel();
        self.visible = false;
    }

    /// Flip visibility (single tap). Returns the new visibility.
    pub fn toggle(&mut self) -> bool {
        if self.visible {
            self.hide();
        } else {
            self.visible = true;
        }
        self.visible
    }

    /// Re-arm on the next scheduling turn instead of inside this event
    pub fn defer_rearm(&mut self, now: Duration) {
        self.rearm.arm(now, Duration::ZERO);
    }

    /// Show and hide again after `delay` regardless of the gate (lock hint)
    pub fn show_briefly(&mut self, now: Duration, delay: Duration) {
        self.visible = true;
        self.rearm.cancel();
        self.hide.arm(now, delay);
    }

    pub fn pointer_enter(&mut self, now: Duration, gate: HideGate) {
        if self.touch {
            return;
        }
        self.hovering = true;
        self.on_input(now, gate);
    }

    pub fn pointer_move(&mut self, now: Duration, gate: HideGate) {
        if self.touch {
            return;
        }
        self.on_input(now, gate);
    }

    pub fn pointer_leave(&mut self, now: Duration, gate: HideGate) {
        if self.touch {
            return;
        }
        self.hovering = false;
        self.hide.cancel();
        if gate.allows_hide() {
            self.hide.arm(now, self.leave_delay);
        }
    }

    /// Fire due deadlines. Returns true if the controls were just hidden.
    pub fn poll(&mut self, now: Duration, gate: HideGate) -> bool {
        if self.rearm.fire(now) && self.visible {
            self.schedule_hide(now, gate);
        }

        if !self.hide.fire(now) {
            return false;
        }
        if self.hover_persists && self.hovering {
            debug!("Hide skipped, pointer still over player");
            return false;
        }
        self.visible = false;
        true
    }
}
