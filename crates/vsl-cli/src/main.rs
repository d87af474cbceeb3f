//! VSL CLI - Headless player for the VSL landing page
//!
//! Features:
//! - Replay recorded interaction scenarios against simulated media
//! - Inspect the analytics a session would emit
//! - Optionally forward those events to a collection endpoint
//! - Print the default player configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use vsl_core::{AnalyticsSink, BeaconSink, FanoutSink, MemorySink, PlayerConfig, TracingSink};

mod output;
mod scenario;

use scenario::{Scenario, Simulator};

/// VSL CLI - Headless video-sales-letter player
#[derive(Parser)]
#[command(name = "vsl")]
#[command(author = "VoltScale")]
#[command(version)]
#[command(about = "Replay VSL player sessions and inspect analytics", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file
    Simulate {
        /// Path to scenario JSON
        scenario: PathBuf,

        /// Player configuration JSON (defaults apply to missing fields)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use touch defaults for the inline player
        #[arg(long)]
        mobile: bool,

        /// Also POST every event to this endpoint
        #[arg(long)]
        beacon: Option<Url>,
    },

    /// Print the default configuration
    Config {
        /// Touch defaults for the inline player
        #[arg(long)]
        mobile: bool,
    },
}

fn load_config(path: Option<&PathBuf>, mobile: bool) -> anyhow::Result<PlayerConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(PlayerConfig::from_json(&json)?)
        }
        None if mobile => Ok(PlayerConfig::mobile()),
        None => Ok(PlayerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    vsl_core::init();

    match cli.command {
        Commands::Simulate {
            scenario: path,
            config,
            mobile,
            beacon,
        } => {
            let config = load_config(config.as_ref(), mobile)?;
            let scenario = Scenario::load(&path)
                .with_context(|| format!("loading scenario {}", path.display()))?;

            let memory = Arc::new(MemorySink::new());
            let mut sink = FanoutSink::new().with(memory.clone());
            if cli.verbose {
                sink = sink.with(Arc::new(TracingSink));
            }
            if let Some(endpoint) = &beacon {
                sink = sink.with(Arc::new(BeaconSink::new(endpoint.clone())));
            }
            let sink: Arc<dyn AnalyticsSink> = Arc::new(sink);

            let mut sim = Simulator::new(scenario, config, sink)?;
            let steps = sim.run()?;
            let report = sim.report(steps, memory.events());

            if beacon.is_some() {
                // Let in-flight beacons finish
                tokio::time::sleep(Duration::from_millis(500)).await;
            }

            println!("{}", output::format_report(&report, &cli.format));
        }
        Commands::Config { mobile } => {
            let config = load_config(None, mobile)?;
            println!("{}", output::format_output(&config, "json"));
        }
    }

    Ok(())
}
