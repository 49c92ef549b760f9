//! Command-line interface definitions for the metrics rollup server.

use std::path::PathBuf;

use clap::Parser;

use metrics_rollup_rs::generator::Pattern;

/// Command-line arguments for the metrics rollup server.
///
/// This structure defines all command-line options and their default values
/// for configuring the server and its background jobs.
#[derive(Debug, Parser)]
#[command(name = "metrics-rollup")]
#[command(
    author,
    version,
    about = "Multi-resolution metrics store: ingestion, rollups, retention, anomaly detection"
)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:19200")]
    pub listen: String,

    /// Path to YAML pipeline config (cardinality limit, retention days)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the rollup watermark state file
    #[arg(long, default_value = "rollup_state.json")]
    pub state_file: PathBuf,

    /// Rollup pass cadence (e.g. 60s, 5m)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "60s")]
    pub rollup_interval: std::time::Duration,

    /// Retention sweep cadence (e.g. 24h)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "24h")]
    pub retention_interval: std::time::Duration,

    /// Disable the background rollup and retention jobs (serve only)
    #[arg(long, default_value_t = false)]
    pub no_jobs: bool,

    /// Seed the store with a generated history of this shape
    /// (noise | sine_wave | linear_trend | spikes)
    #[arg(long)]
    pub seed_pattern: Option<Pattern>,

    /// Metric name used for seeded samples
    #[arg(long, default_value = "demo_metric")]
    pub seed_metric: String,

    /// Number of seeded samples
    #[arg(long, default_value_t = 120)]
    pub seed_points: usize,
}
