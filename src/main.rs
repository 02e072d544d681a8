// ECS Service Metrics Collector
//
// Periodically inventories every ECS cluster, service, and task in an
// account/region, joins the results into one record per service, and
// emits each record as a JSON log line on stdout. Diagnostics go to
// stderr via tracing so the metric stream stays clean.
//
// # Usage
// ecs-service-metrics [--region <region>] [--interval <secs>] [--once]
//
// Region falls back to AWS_REGION, then us-east-1. The default interval
// is 60 seconds. Credentials come from the standard AWS provider chain.

use std::env;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod emit;
mod model;
mod pipeline;
mod scheduler;

use api::aws::{Ec2Api, EcsApi};
use config::CollectorConfig;
use emit::MetricsEmitter;
use pipeline::Pipeline;
use scheduler::CycleScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("=== ECS Service Metrics Collector Starting ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = parse_arguments();
    let settings = CollectorConfig::resolve(args.region, args.interval, args.run_once)
        .context("Invalid configuration")?;

    info!("Region: {}", settings.region);
    info!("Collection interval: {}s", settings.interval.as_secs());

    // One shared config, one client per service, constructed once and
    // passed into the pipeline as explicit dependencies.
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .load()
        .await;

    let pipeline = Pipeline::new(
        Arc::new(EcsApi::new(&shared_config)),
        Arc::new(Ec2Api::new(&shared_config)),
    );

    if settings.run_once {
        info!("Running a single collection cycle (--once)");
        run_cycle(&pipeline).await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, stopping after the current cycle");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("failed to listen for shutdown signal: {e}");
                // Keep the sender alive so the scheduler runs on.
                std::future::pending::<()>().await;
            }
        }
    });

    info!("=== ECS Service Metrics Collector Started ===");
    info!("Press Ctrl+C to stop");

    CycleScheduler::new(settings.interval)
        .run(|| run_cycle(&pipeline), shutdown_rx)
        .await;

    info!("Collector stopped");
    Ok(())
}

/// One collection cycle: gather, join, emit.
async fn run_cycle(pipeline: &Pipeline) {
    let started = Instant::now();
    let clusters = pipeline.collect().await;

    let stdout = io::stdout();
    let mut emitter = MetricsEmitter::new(stdout.lock());
    match emitter.emit(&clusters) {
        Ok(emitted) => info!(
            clusters = clusters.len(),
            emitted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "emitted service metrics"
        ),
        Err(e) => error!("failed to emit service metrics: {e}"),
    }
}

/// Command-line flags before resolution against the environment.
struct CliArgs {
    region: Option<String>,
    interval: Option<String>,
    run_once: bool,
}

/// Parses command-line arguments.
///
/// # Arguments
/// * `--region <region>` - AWS region (optional, falls back to AWS_REGION)
/// * `--interval <secs>` - seconds between cycle starts (optional, default 60)
/// * `--once` - run one cycle and exit
fn parse_arguments() -> CliArgs {
    let args: Vec<String> = env::args().collect();

    let find_arg = |flag: &str| -> Option<String> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|pos| args.get(pos + 1))
            .map(|s| s.to_string())
    };

    CliArgs {
        region: find_arg("--region"),
        interval: find_arg("--interval"),
        run_once: args.contains(&"--once".to_string()),
    }
}

/// Initializes the logging subsystem.
///
/// All diagnostics go to stderr: the metric lines own stdout. Under
/// systemd (detected via INVOCATION_ID) logs are JSON for the journal;
/// in a terminal they are human-readable with colors. Default level is
/// INFO, overridable with RUST_LOG.
fn init_logging() {
    let is_systemd = env::var("INVOCATION_ID").is_ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if is_systemd {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_writer(io::stderr),
            )
            .init();
    }
}
