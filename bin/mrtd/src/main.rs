//! ---
//! mrt_section: "01-core-functionality"
//! mrt_subsection: "binary"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Binary entrypoint for the mission resilience daemon."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mrt_common::{AppConfig, PersistenceConfig, TrackerConfig};
use mrt_metrics::{new_registry, spawn_http_server, DaemonMetrics, SharedRegistry};
use mrt_msg::{InboundEvent, MessageBus};
use mrt_tracker::{
    EventLogMirror, EventMirror, MirrorFactory, MissionTracker, TrackerMetrics, TrackerRegistry,
};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("mrtd ", env!("CARGO_PKG_VERSION")),
    about = "Mission resilience daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Track every configured mission until ctrl-c")]
    Run(RunArgs),
    #[command(about = "Rebuild a mission from its event log and print a report")]
    Report(ReportArgs),
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "JSONL file of inbound events published once trackers are up"
    )]
    inbound: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long, value_name = "FILE", help = "Mirrored event log to replay")]
    event_log: PathBuf,

    #[arg(long, value_name = "ID", help = "Mission to report on")]
    mission: String,

    #[arg(long, default_value_t = 24, help = "Report window in hours, ending now")]
    hours: u32,

    #[arg(long, value_enum, default_value_t = CliFormat::Json)]
    format: CliFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    Json,
    Csv,
}

impl CliFormat {
    fn as_str(self) -> &'static str {
        match self {
            CliFormat::Json => "json",
            CliFormat::Csv => "csv",
        }
    }
}

fn config_candidates(cli: &Cli) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/mrtd.toml"));
    candidates.push(PathBuf::from("configs/mrtd.example.toml"));
    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let candidates = config_candidates(&cli);

    match cli.command {
        Some(Commands::Report(args)) => render_report(&candidates, args),
        Some(Commands::Run(args)) => run_daemon(&candidates, args).await,
        None => run_daemon(&candidates, RunArgs::default()).await,
    }
}

async fn run_daemon(candidates: &[PathBuf], args: RunArgs) -> Result<()> {
    let load_started = Instant::now();
    let loaded = AppConfig::load_with_source(candidates)?;
    let config = loaded.config;
    let load_duration = load_started.elapsed();

    let metrics_registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(metrics_registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(env!("CARGO_PKG_VERSION"), build_profile());

    mrt_common::init_tracing("mrtd", &config.logging)?;
    info!(config_path = %loaded.source.display(), missions = config.missions.len(), "configuration loaded");
    if config.missions.is_empty() {
        warn!("no missions configured; daemon will only serve metrics");
    }

    let metrics_server = if config.metrics.enabled {
        info!(address = %config.metrics.listen, "metrics exporter enabled");
        Some(spawn_http_server(metrics_registry.clone(), config.metrics.listen)?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let bus = MessageBus::default();
    let registry = build_registry(&bus, &metrics_registry, &config.persistence)?;
    for mission in &config.missions {
        let tracker = registry
            .get_or_create(mission.clone())
            .with_context(|| format!("failed to create tracker for mission {}", mission.mission_id))?;
        tracker.initialize().await?;
    }

    if let Some(path) = &args.inbound {
        let published = publish_inbound_feed(&bus, path).await?;
        info!(path = %path.display(), published, "inbound feed published");
    }

    info!(missions = ?registry.mission_ids(), "daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    registry.cleanup_all().await;

    let bus_metrics = bus.metrics();
    info!(
        published = bus_metrics.published,
        undelivered = bus_metrics.undelivered,
        "notification bus drained"
    );

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}

fn build_registry(
    bus: &MessageBus,
    metrics_registry: &SharedRegistry,
    persistence: &PersistenceConfig,
) -> Result<TrackerRegistry> {
    let tracker_metrics = TrackerMetrics::new(metrics_registry.clone())?;
    let registry = TrackerRegistry::new(Some(bus.clone()), Some(tracker_metrics));
    if !persistence.mirror_events {
        return Ok(registry);
    }
    info!(directory = %persistence.directory.display(), "event mirroring enabled");
    let persistence = persistence.clone();
    let factory: MirrorFactory = Arc::new(move |mission_id: &str| -> mrt_tracker::Result<Arc<dyn EventMirror>> {
        let mirror = EventLogMirror::open(persistence.event_log_path(mission_id))?;
        Ok(Arc::new(mirror))
    });
    Ok(registry.with_mirror_factory(factory))
}

async fn publish_inbound_feed(bus: &MessageBus, path: &Path) -> Result<usize> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("unable to read inbound feed {}", path.display()))?;
    let mut published = 0usize;
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match InboundEvent::from_json_line(line) {
            Ok(event) => {
                bus.publish_inbound(event);
                published += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), line = line_no + 1, error = %err, "skipping malformed inbound event");
            }
        }
    }
    Ok(published)
}

/// Replays quietly: stdout carries only the export.
fn render_report(candidates: &[PathBuf], args: ReportArgs) -> Result<()> {
    if args.hours == 0 {
        bail!("--hours must be at least 1");
    }
    let mission_config = AppConfig::load(candidates)
        .ok()
        .and_then(|config| config.mission(&args.mission).cloned())
        .unwrap_or_else(|| TrackerConfig::new(args.mission.clone()))
        .with_real_time_tracking(false);

    let tracker = MissionTracker::standalone(mission_config)?;
    tracker
        .replay_from_log(&args.event_log)
        .with_context(|| format!("unable to replay {}", args.event_log.display()))?;

    let end = Utc::now();
    let start = end - ChronoDuration::hours(i64::from(args.hours));
    let report = tracker.generate_report(Some(start), Some(end));
    let rendered = tracker.export_report(&report, args.format.as_str())?;
    println!("{rendered}");
    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
