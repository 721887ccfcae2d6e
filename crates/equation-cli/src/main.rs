use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use equation_core::{DeviceSource, DeviceTracker, JsonFileSource, SyncReport, SystemClock, TrackerConfig};
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Debug, Parser)]
#[command(name = "equationd")]
#[command(about = "Equation radiator state monitor (read-only)")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value = "./devices.json")]
    source: String,

    #[arg(long, default_value_t = 60_000, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    fetch_timeout_ms: u64,

    #[arg(long)]
    device_id: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    List,
    Once {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    At {
        /// Local time, e.g. 2026-01-05T08:30
        #[arg(long, value_parser = parse_local_time)]
        time: NaiveDateTime,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

fn parse_local_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|err| format!("expected YYYY-MM-DDTHH:MM[:SS]: {err}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = TrackerConfig {
        sync_interval: Duration::from_millis(cli.interval_ms),
        fetch_timeout: Duration::from_millis(cli.fetch_timeout_ms),
    };

    let source = JsonFileSource::new(cli.source.clone());
    let mut tracker = DeviceTracker::new(source, config, cli.device_id);

    match cli.command {
        Command::List => {
            let found = tracker
                .discover()
                .await
                .with_context(|| format!("listing devices from {}", cli.source))?;
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
        Command::Once { format } => {
            let report = tracker.sync(&SystemClock).await?;
            print_sync(&tracker, &report, format)?;
        }
        Command::Watch { format } => {
            watch_loop(&mut tracker, format).await?;
        }
        Command::At { time } => {
            tracker.sync(&SystemClock).await?;
            let projections = tracker
                .snapshots()
                .map(|s| render::projection(s, time))
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&projections)?);
        }
    }

    Ok(())
}

async fn watch_loop<S: DeviceSource>(tracker: &mut DeviceTracker<S>, format: OutputFormat) -> Result<()> {
    let start = Instant::now() + Duration::from_millis(50);
    let interval = tracker.sync_interval();
    let mut ticker = interval_at(start, interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            _ = ticker.tick() => {
                match tracker.sync(&SystemClock).await {
                    Ok(report) => {
                        print_sync(tracker, &report, format)?;
                        info!(devices = report.created.len() + report.updated.len(), failures = report.failures.len(), syncs = tracker.syncs(), "sync");
                    }
                    Err(err) => warn!(error = %err, "sync failed, keeping previous snapshots"),
                }
            }
        }
    }

    Ok(())
}

fn print_sync<S: DeviceSource>(tracker: &DeviceTracker<S>, report: &SyncReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "report": report,
                "devices": tracker.snapshots().map(|s| s.as_ref()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Ndjson => {
            for snapshot in tracker.snapshots() {
                println!("{}", serde_json::to_string(snapshot.as_ref())?);
            }
        }
        OutputFormat::Human => {
            println!("{}", render::human_report(report));
            for snapshot in tracker.snapshots() {
                println!("{}", render::human_snapshot(snapshot));
            }
        }
    }

    Ok(())
}
