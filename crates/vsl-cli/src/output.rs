//! Output formatting for CLI

use crate::scenario::Report;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use vsl_core::{format_time, SurfaceSnapshot, VideoEvent, VideoEventKind};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Format output based on selected format
pub fn format_output<T: Serialize>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table | OutputFormat::Text => {
            format!("{:?}", serde_json::to_value(data).unwrap_or_default())
        }
    }
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "#")]
    sequence: u64,
    event: &'static str,
    detail: String,
    position: String,
    #[tabled(rename = "%")]
    percentage: String,
}

impl From<&VideoEvent> for EventRow {
    fn from(event: &VideoEvent) -> Self {
        let detail = match &event.kind {
            VideoEventKind::Progress { milestone } => format!("{milestone}%"),
            VideoEventKind::Seek { from, to } => {
                format!("{} -> {}", format_time(*from), format_time(*to))
            }
            VideoEventKind::VolumeChange { volume } => format!("{:.0}%", volume * 100.0),
            VideoEventKind::Fullscreen { action } => format!("{action:?}").to_lowercase(),
            _ => String::new(),
        };
        Self {
            sequence: event.sequence,
            event: event.kind.name(),
            detail,
            position: format!("{} / {}", format_time(event.current_time), format_time(event.duration)),
            percentage: format!("{:.1}", event.percentage),
        }
    }
}

fn describe(label: &str, s: &SurfaceSnapshot) -> String {
    let p = &s.playback;
    let mut out = format!(
        "{label}:\n  {} {} / {} ({:.1}%), buffered {:.1}%\n  volume {:.0}%{}  speed {}\n  controls {}",
        if p.is_playing { "playing" } else { "paused" },
        format_time(p.current_time),
        format_time(p.duration),
        p.progress_fraction,
        p.buffered_fraction,
        p.volume * 100.0,
        if p.is_muted { " (muted)" } else { "" },
        p.playback_rate,
        if s.controls_visible { "visible" } else { "hidden" },
    );
    if let Some(menu) = s.menu {
        out.push_str(&format!(", {menu:?} menu open"));
    }
    if s.locked {
        out.push_str(", locked");
    }
    out
}

/// Render a replay report
pub fn format_report(report: &Report, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => format_output(report, format),
        OutputFormat::Table => {
            let rows: Vec<EventRow> = report.events.iter().map(EventRow::from).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Text => {
            let mut out = format!(
                "Replayed {} steps over {}\n\n",
                report.steps,
                format_time(report.elapsed_ms as f64 / 1000.0)
            );
            out.push_str(&describe("Inline", &report.final_state.inline));
            if let Some(fullscreen) = &report.final_state.fullscreen {
                out.push('\n');
                out.push_str(&describe("Fullscreen", fullscreen));
            }
            out.push_str(&format!("\n\nAnalytics ({} events):\n", report.events.len()));
            for row in report.events.iter().map(EventRow::from) {
                out.push_str(&format!(
                    "  {:>3}. {:<14} {:<16} {}\n",
                    row.sequence, row.event, row.detail, row.position
                ));
            }
            out
        }
    }
}
