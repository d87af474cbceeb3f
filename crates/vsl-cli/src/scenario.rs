//! Scenario replay against simulated media

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use vsl_core::{
    AnalyticsSink, AutoplayPolicy, Key, ManualClock, Menu, NoopScreen, PlayerConfig,
    PlayerSnapshot, SimulatedMedia, SurfaceKind, VideoEvent, VslPlayer,
};

/// Media time-update cadence while waiting (milliseconds)
const TICK_MS: u64 = 250;

/// A recorded sequence of viewer interactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Media duration in seconds
    pub duration: f64,
    /// Metadata available from the start
    #[serde(default = "default_true")]
    pub metadata_loaded: bool,
    /// What the simulated platform allows `play()` to do
    #[serde(default)]
    pub autoplay: AutoplayPolicy,
    pub steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&json)?;
        anyhow::ensure!(
            scenario.duration.is_finite() && scenario.duration > 0.0,
            "scenario duration must be positive"
        );
        Ok(scenario)
    }
}

/// One viewer interaction or elapsed time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Tap { x: f64, width: f64 },
    Key { key: String },
    PointerEnter,
    PointerMove,
    PointerLeave,
    PlayPause,
    Seek { delta: f64 },
    SeekTo { fraction: f64 },
    Volume { value: f64 },
    Mute,
    Rate { rate: f64 },
    Menu { menu: Menu },
    Lock,
    Brightness,
    Viewport { ratio: f64 },
    LoadMetadata,
    OpenFullscreen,
    CloseFullscreen,
    /// Let time pass with media playing
    Wait { ms: u64 },
}

/// Outcome of a replay
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps: usize,
    pub elapsed_ms: u64,
    pub events: Vec<VideoEvent>,
    #[serde(rename = "final")]
    pub final_state: PlayerSnapshot,
}

/// Replays a scenario step by step
pub struct Simulator {
    player: VslPlayer<SimulatedMedia>,
    clock: ManualClock,
    scenario: Scenario,
}

impl Simulator {
    pub fn new(
        scenario: Scenario,
        config: PlayerConfig,
        sink: Arc<dyn AnalyticsSink>,
    ) -> anyhow::Result<Self> {
        let clock = ManualClock::new();
        let media = Self::media(&scenario, scenario.metadata_loaded);
        let player = VslPlayer::new(media, config, sink, Arc::new(clock.clone()))?;
        Ok(Self {
            player,
            clock,
            scenario,
        })
    }

    fn media(scenario: &Scenario, loaded: bool) -> SimulatedMedia {
        let media = if loaded {
            SimulatedMedia::loaded(scenario.duration)
        } else {
            SimulatedMedia::new(scenario.duration)
        };
        media.with_policy(scenario.autoplay)
    }

    pub fn player(&self) -> &VslPlayer<SimulatedMedia> {
        &self.player
    }

    /// Run every step, returning how many ran
    pub fn run(&mut self) -> anyhow::Result<usize> {
        let steps = self.scenario.steps.clone();
        for (i, step) in steps.iter().enumerate() {
            debug!(step = i, ?step, "Replaying");
            self.apply(step)?;
            self.player.poll();
        }
        info!(
            steps = steps.len(),
            elapsed_ms = self.clock_ms(),
            "Scenario complete"
        );
        Ok(steps.len())
    }

    pub fn clock_ms(&self) -> u64 {
        use vsl_core::Clock;
        self.clock.now().as_millis() as u64
    }

    fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        let p = &mut self.player;
        match step {
            Step::Tap { x, width } => {
                p.tap(*x, *width);
            }
            Step::Key { key } => {
                p.key(key.parse::<Key>()?);
            }
            Step::PointerEnter => p.pointer_enter(),
            Step::PointerMove => p.pointer_move(),
            Step::PointerLeave => p.pointer_leave(),
            Step::PlayPause => {
                p.toggle_play_pause();
            }
            Step::Seek { delta } => p.seek_by(*delta),
            Step::SeekTo { fraction } => p.seek_to_fraction(*fraction),
            Step::Volume { value } => p.set_volume(*value),
            Step::Mute => p.toggle_mute(),
            Step::Rate { rate } => p.set_playback_rate(*rate)?,
            Step::Menu { menu } => p.toggle_menu(*menu),
            Step::Lock => {
                p.toggle_lock();
            }
            Step::Brightness => {
                p.cycle_brightness();
            }
            Step::Viewport { ratio } => p.on_viewport_visibility(*ratio),
            Step::LoadMetadata => {
                let events = p.inline_mut().media_mut().load_metadata();
                for event in events {
                    p.handle_media_event(SurfaceKind::Inline, event);
                }
            }
            Step::OpenFullscreen => {
                let overlay = Self::media(&self.scenario, true);
                p.open_fullscreen(overlay, Box::new(NoopScreen));
            }
            Step::CloseFullscreen => {
                p.close_fullscreen();
            }
            Step::Wait { ms } => self.wait(*ms),
        }
        Ok(())
    }

    fn wait(&mut self, ms: u64) {
        let mut remaining = ms;
        while remaining > 0 {
            let tick = remaining.min(TICK_MS);
            remaining -= tick;
            self.clock.advance_ms(tick);

            for kind in [SurfaceKind::Inline, SurfaceKind::Fullscreen] {
                let Some(surface) = self.player.surface_mut(kind) else {
                    continue;
                };
                let events = surface.media_mut().advance(tick as f64 / 1000.0);
                for event in events {
                    self.player.handle_media_event(kind, event);
                }
            }
            self.player.poll();
        }
    }

    pub fn report(&self, steps: usize, events: Vec<VideoEvent>) -> Report {
        Report {
            steps,
            elapsed_ms: self.clock_ms(),
            events,
            final_state: self.player.snapshot(),
        }
    }
}
