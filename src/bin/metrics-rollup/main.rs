//! # Metrics Rollup Server CLI
//!
//! Command-line interface for the metrics rollup server.
//!
//! This binary wires the in-memory store, the HTTP surface, and the
//! periodic rollup/retention jobs together, with options for seeding demo
//! data and tuning the job cadence.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use time::OffsetDateTime;
use tracing_subscriber::{fmt, EnvFilter};

use metrics_rollup_rs::config::PipelineConfig;
use metrics_rollup_rs::generator::seed_history;
use metrics_rollup_rs::http::{build_router, AppState};
use metrics_rollup_rs::jobs::{spawn_retention_job, spawn_rollup_job};
use metrics_rollup_rs::retention::RetentionEnforcer;
use metrics_rollup_rs::rollup::RollupEngine;
use metrics_rollup_rs::store::{MemoryStore, MetricStore};
use metrics_rollup_rs::watermark::WatermarkStore;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> io::Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load pipeline config (can work without file - defaults)
    let config = if let Some(path) = &cli.config {
        PipelineConfig::load_from_path(path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
    } else {
        PipelineConfig::default()
    };

    // Create the shared in-memory store
    let store: Arc<dyn MetricStore> = Arc::new(MemoryStore::new());

    // Optionally seed a generated history for demos
    if let Some(pattern) = cli.seed_pattern {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let written = seed_history(&store, &cli.seed_metric, pattern, cli.seed_points, 60, now)
            .map_err(io::Error::other)?;
        tracing::info!("seeded {written} '{}' samples for metric {}", pattern.as_str(), cli.seed_metric);
    }

    // Spawn the background jobs
    if cli.no_jobs {
        tracing::info!("background jobs disabled");
    } else {
        let engine = RollupEngine::new(store.clone());
        let watermark = WatermarkStore::new(&cli.state_file);
        // Detached: the tasks loop for the life of the process.
        let _ = spawn_rollup_job(engine, watermark, cli.rollup_interval);

        let enforcer = RetentionEnforcer::new(store.clone(), config.retention);
        let _ = spawn_retention_job(enforcer, cli.retention_interval);
    }

    let state = AppState::builder().with_store(store).with_config(config).build()?;

    let app = build_router(state);

    let addr: SocketAddr = cli.listen.parse().map_err(io::Error::other)?;
    tracing::info!("starting metrics-rollup on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
