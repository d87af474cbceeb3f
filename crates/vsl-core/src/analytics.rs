//! Analytics event emission
//!
//! Every surface reports viewer behaviour as [`VideoEvent`] records:
//! - play / pause / complete
//! - progress milestones (25, 50, 75, 90 percent)
//! - seeks, volume changes, fullscreen open/close
//!
//! Delivery is fire-and-forget. A failing sink is logged and otherwise
//! ignored so it can never disturb playback.

use crate::types::{percent_of, SessionId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Percentages that fire a `progress` event once per viewing
pub const MILESTONES: [u8; 4] = [25, 50, 75, 90];

/// Fullscreen transition direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullscreenAction {
    Open,
    Close,
}

/// Analytics event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoEventKind {
    Play,
    Pause,
    Complete,
    Progress { milestone: u8 },
    Seek { from: f64, to: f64 },
    VolumeChange { volume: f64 },
    Fullscreen { action: FullscreenAction },
}

impl VideoEventKind {
    /// Short name, e.g. `volume_change`
    pub fn name(&self) -> &'static str {
        match self {
            VideoEventKind::Play => "play",
            VideoEventKind::Pause => "pause",
            VideoEventKind::Complete => "complete",
            VideoEventKind::Progress { .. } => "progress",
            VideoEventKind::Seek { .. } => "seek",
            VideoEventKind::VolumeChange { .. } => "volume_change",
            VideoEventKind::Fullscreen { .. } => "fullscreen",
        }
    }
}

/// Analytics event with playback context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEvent {
    /// Unique event ID
    pub id: Uuid,
    /// Viewing session
    pub session_id: SessionId,
    /// Video the event belongs to
    pub video_name: String,
    /// Sequence number within the session
    pub sequence: u64,
    /// Wall-clock time of emission
    pub timestamp: DateTime<Utc>,
    /// Playhead in seconds
    pub current_time: f64,
    /// Media duration in seconds (0 when unknown)
    pub duration: f64,
    /// Playhead as a percentage of the duration
    pub percentage: f64,
    /// The event
    #[serde(flatten)]
    pub kind: VideoEventKind,
}

/// Destination for analytics events
pub trait AnalyticsSink: Send + Sync {
    fn deliver(&self, event: &VideoEvent) -> Result<()>;
}

/// Stamps events with session context and hands them to a sink
#[derive(Clone)]
pub struct AnalyticsEmitter {
    video_name: String,
    session_id: SessionId,
    sequence: Arc<AtomicU64>,
    sink: Option<Arc<dyn AnalyticsSink>>,
}

impl AnalyticsEmitter {
    pub fn new(video_name: impl Into<String>, sink: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            video_name: video_name.into(),
            session_id: SessionId::new(),
            sequence: Arc::new(AtomicU64::new(0)),
            sink: Some(sink),
        }
    }

    /// Emitter that drops everything
    pub fn disabled() -> Self {
        Self {
            video_name: String::new(),
            session_id: SessionId::new(),
            sequence: Arc::new(AtomicU64::new(0)),
            sink: None,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn video_name(&self) -> &str {
        &self.video_name
    }

    /// Emit an analytics event
    pub fn emit(&self, kind: VideoEventKind, current_time: f64, duration: f64) {
        let Some(sink) = &self.sink else {
            return;
        };

        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        let event = VideoEvent {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            video_name: self.video_name.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            current_time,
            duration,
            percentage: percent_of(current_time, duration),
            kind,
        };

        debug!(event = event.kind.name(), sequence = event.sequence, "Analytics event");

        if let Err(e) = sink.deliver(&event) {
            warn!(error = %e, event = event.kind.name(), "Dropping analytics event");
        }
    }
}

impl std::fmt::Debug for AnalyticsEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsEmitter")
            .field("video_name", &self.video_name)
            .field("session_id", &self.session_id)
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

/// Tracks which progress milestones already fired this viewing
#[derive(Debug, Clone, Default)]
pub struct MilestoneTracker {
    fired: BTreeSet<u8>,
}

impl MilestoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milestones newly crossed at this position, ascending
    pub fn crossed(&mut self, current_time: f64, duration: f64) -> Vec<u8> {
        if !(duration.is_finite() && duration > 0.0) {
            return Vec::new();
        }
        let percentage = (current_time / duration * 100.0).floor();

        MILESTONES
            .iter()
            .copied()
            .filter(|m| percentage >= f64::from(*m))
            .filter(|m| self.fired.insert(*m))
            .collect()
    }

    pub fn fired(&self) -> impl Iterator<Item = u8> + '_ {
        self.fired.iter().copied()
    }

    pub fn reset(&mut self) {
        self.fired.clear();
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// In-memory buffer of delivered events
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<VideoEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all buffered events
    pub fn events(&self) -> Vec<VideoEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event kinds in delivery order
    pub fn kinds(&self) -> Vec<VideoEventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }

    /// Clear buffer
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl AnalyticsSink for MemorySink {
    fn deliver(&self, event: &VideoEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| Error::delivery("memory sink poisoned"))?
            .push(event.clone());
        Ok(())
    }
}

/// Logs each event, the development console of the player
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn deliver(&self, event: &VideoEvent) -> Result<()> {
        info!(
            video = %event.video_name,
            event = event.kind.name(),
            current_time = event.current_time,
            percentage = event.percentage,
            "[Video Analytics] {}",
            serde_json::to_string(&event.kind)?
        );
        Ok(())
    }
}

/// Non-blocking hand-off to an async consumer
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<VideoEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<VideoEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiving end of its channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<VideoEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl AnalyticsSink for ChannelSink {
    fn deliver(&self, event: &VideoEvent) -> Result<()> {
        self.tx
            .try_send(event.clone())
            .map_err(|e| Error::delivery(e.to_string()))
    }
}

/// Posts each event as JSON to a collection endpoint
#[cfg(feature = "beacon")]
#[derive(Debug, Clone)]
pub struct BeaconSink {
    client: reqwest::Client,
    endpoint: url::Url,
}

#[cfg(feature = "beacon")]
impl BeaconSink {
    pub fn new(endpoint: url::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[cfg(feature = "beacon")]
impl AnalyticsSink for BeaconSink {
    fn deliver(&self, event: &VideoEvent) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::delivery("no async runtime for beacon"))?;

        let request = self.client.post(self.endpoint.clone()).json(event);
        let name = event.kind.name();
        handle.spawn(async move {
            match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(_) => debug!(event = name, "Beacon delivered"),
                Err(e) => warn!(error = %e, event = name, "Beacon failed"),
            }
        });
        Ok(())
    }
}

/// Delivers to several sinks; one failing does not stop the others
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn AnalyticsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AnalyticsSink for FanoutSink {
    fn deliver(&self, event: &VideoEvent) -> Result<()> {
        let failures: Vec<String> = self
            .sinks
            .iter()
            .filter_map(|sink| sink.deliver(event).err())
            .map(|e| e.to_string())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::delivery(failures.join("; ")))
        }
    }
}
