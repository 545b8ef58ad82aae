//! pdm-trends - Predictive Maintenance Trend Analysis
//!
//! Ingests sensor readings, runs a trend analysis cycle on a fixed
//! interval, and publishes per-sensor and per-machine verdicts.
//!
//! # Usage
//!
//! ```bash
//! # Live readings from the simulator
//! ./simulation --limits limits.csv | ./pdm-trends --stdin --limits limits.csv
//!
//! # Replay captured JSON-lines files (one producer per file) and serve the API
//! ./pdm-trends --limits limits.csv --replay plant_a.jsonl --replay plant_b.jsonl --serve
//! ```
//!
//! # Environment Variables
//!
//! - `PDM_CONFIG`: Path to the TOML tuning file (default: ./pdm_config.toml)
//! - `PDM_LIMITS`: Path to the operational limits CSV
//! - `PDM_CORS_ORIGINS`: Comma-separated origins allowed by the HTTP API
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pdm_trends::api::{create_app, ApiState};
use pdm_trends::config::{defaults, limits::load_limits, TrendConfig};
use pdm_trends::engine::TrendEngine;
use pdm_trends::pipeline::{AnalysisScheduler, IngestLoop, ReadingSource, ReplaySource, StdinSource};
use pdm_trends::report::{OutputFormat, ReportPublisher};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pdm-trends")]
#[command(about = "Predictive maintenance trend analysis for sensor fleets")]
#[command(version)]
struct CliArgs {
    /// Operational limits CSV (machineName:sensorName,operationalHigh,operationalLow)
    #[arg(long, env = "PDM_LIMITS", default_value = defaults::LIMITS_PATH)]
    limits: PathBuf,

    /// Read JSON reading messages from stdin (default when no --replay is given)
    #[arg(long)]
    stdin: bool,

    /// Replay a JSON-lines capture; repeat for several concurrent producers
    #[arg(long, value_name = "FILE")]
    replay: Vec<PathBuf>,

    /// Delay between replayed messages in milliseconds
    #[arg(long, default_value = "0")]
    speed_ms: u64,

    /// Override the analysis interval in seconds
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Print each cycle report as one JSON document on stdout
    #[arg(long)]
    json: bool,

    /// Also write each report to this file (atomically replaced)
    #[arg(long, value_name = "PATH")]
    status_file: Option<PathBuf>,

    /// Serve the HTTP status API; keeps running after sources end until Ctrl+C
    #[arg(long)]
    serve: bool,

    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Explicit TOML config path (skips the PDM_CONFIG / ./pdm_config.toml search)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Task Names
// ============================================================================

#[derive(Debug, Clone)]
enum TaskName {
    Ingest(String),
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::Ingest(source) => write!(f, "Ingest[{}]", source),
        }
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Logs go to stderr so `--json` reports own stdout.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(args: &CliArgs) -> Result<TrendConfig> {
    let mut cfg = match &args.config {
        Some(path) => TrendConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TrendConfig::load(),
    };
    if let Some(secs) = args.interval_secs {
        cfg.schedule.interval_secs = secs;
    }
    if let Some(addr) = &args.addr {
        cfg.server.addr = addr.clone();
    }
    cfg.validate().context("Invalid configuration")?;
    Ok(cfg)
}

fn build_sources(args: &CliArgs) -> Result<Vec<Box<dyn ReadingSource>>> {
    let mut sources: Vec<Box<dyn ReadingSource>> = Vec::new();
    for path in &args.replay {
        let source = ReplaySource::load(path, args.speed_ms)?;
        info!("📂 Replay {}: {} messages", path.display(), source.remaining());
        sources.push(Box::new(source));
    }
    if args.stdin || sources.is_empty() {
        sources.push(Box::new(StdinSource::new()));
    }
    Ok(sources)
}

// ============================================================================
// Task Spawning
// ============================================================================

/// Spawn one ingest loop per source into the producer set.
fn spawn_producers(
    task_set: &mut JoinSet<Result<TaskName>>,
    sources: Vec<Box<dyn ReadingSource>>,
    engine: &Arc<TrendEngine>,
    cancel_token: &CancellationToken,
) {
    for mut source in sources {
        let ingest = IngestLoop::new(Arc::clone(engine), cancel_token.clone());
        task_set.spawn(async move {
            let stats = ingest.run(source.as_mut()).await;
            Ok(TaskName::Ingest(stats.source))
        });
    }
}

/// Spawn the HTTP server; it stops when `cancel_token` fires.
async fn spawn_http_server(
    addr: &str,
    state: ApiState,
    cancel_token: CancellationToken,
) -> Result<tokio::task::JoinHandle<Result<()>>> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("✓ HTTP status API listening on http://{}/api/v1", addr);

    let app = create_app(state);
    Ok(tokio::spawn(async move {
        info!("[HttpServer] Task starting");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;
        info!("[HttpServer] Graceful shutdown complete");
        Ok(())
    }))
}

/// Wait for every producer to finish. A failed or panicked producer
/// cancels the rest.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: {} producers spawned, monitoring...", task_set.len());
    let mut outcome = Ok(());

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(task_name)) => {
                info!("🔒 Supervisor: Task {} completed normally", task_name);
            }
            Ok(Err(e)) => {
                error!("🔒 Supervisor: Task failed with error: {}", e);
                cancel_token.cancel();
                outcome = Err(e);
            }
            Err(e) => {
                error!("🔒 Supervisor: Task panicked: {}", e);
                cancel_token.cancel();
                outcome = Err(anyhow::anyhow!("Task panicked: {}", e));
            }
        }
    }

    info!("🔒 Supervisor: All producers finished");
    outcome
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let cfg = load_config(&args)?;
    let limits = load_limits(&args.limits)
        .with_context(|| format!("Cannot start without operational limits ({})", args.limits.display()))?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  pdm-trends - Predictive Maintenance Trend Analysis");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Limits:   {} sensors", limits.len());
    info!("   Window:   {} points", cfg.window.capacity);
    info!("   Interval: {}s", cfg.schedule.interval_secs);
    if limits.is_empty() {
        warn!("No operational limits loaded; every sensor will be skipped by analysis");
    }

    let interval = Duration::from_secs(cfg.schedule.interval_secs);
    let server_addr = cfg.server.addr.clone();
    let engine = Arc::new(TrendEngine::new(limits, cfg));

    let format = if args.json { OutputFormat::Json } else { OutputFormat::Text };
    let mut publisher = ReportPublisher::new(format);
    if let Some(path) = &args.status_file {
        publisher = publisher.with_status_file(path);
    }
    let publisher = Arc::new(publisher);

    // Ctrl+C stops producers; the scheduler and server have their own tokens
    // so shutdown can proceed in order.
    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        signal_token.cancel();
    });

    let server = if args.serve {
        let state = ApiState::new(Arc::clone(&engine), Arc::clone(&publisher));
        Some(spawn_http_server(&server_addr, state, shutdown_token.clone()).await?)
    } else {
        None
    };

    let analysis_token = CancellationToken::new();
    let scheduler = tokio::spawn(
        AnalysisScheduler::new(
            Arc::clone(&engine),
            Arc::clone(&publisher),
            interval,
            analysis_token.clone(),
        )
        .run(),
    );

    let mut producers: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_producers(&mut producers, build_sources(&args)?, &engine, &shutdown_token);
    let producer_result = run_supervisor(&mut producers, &shutdown_token).await;

    // Producers are done: drain with one final cycle
    analysis_token.cancel();
    let cycles = scheduler.await.context("Analysis task panicked")??;

    if let Some(server) = server {
        if !shutdown_token.is_cancelled() {
            info!("Sources exhausted; still serving the final report until Ctrl+C");
        }
        shutdown_token.cancelled().await;
        server.await.context("HTTP server task panicked")??;
    }

    let store = engine.store_stats();
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("📊 FINAL STATISTICS");
    info!("   Cycles Run:        {}", cycles);
    info!("   Sensors Tracked:   {}", store.sensors);
    info!("   Readings Appended: {}", store.appended);
    info!("   Readings Evicted:  {}", store.evicted);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    producer_result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_multiple_replay_sources() {
        let args = CliArgs::try_parse_from([
            "pdm-trends",
            "--limits",
            "limits.csv",
            "--replay",
            "a.jsonl",
            "--replay",
            "b.jsonl",
            "--interval-secs",
            "5",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.replay.len(), 2);
        assert_eq!(args.interval_secs, Some(5));
        assert!(args.json && !args.stdin && !args.serve);
    }

    #[test]
    fn interval_override_is_validated() {
        let args = CliArgs::try_parse_from(["pdm-trends", "--interval-secs", "0"]).unwrap();
        assert!(load_config(&args).is_err());
    }
}
