//! Periodic background jobs.
//!
//! The rollup and retention passes each run on their own tokio task,
//! looping over an interval timer. One task per job gives single-flight by
//! construction: a tick that fires while a pass is still running is
//! skipped, never overlapped. The jobs share state with the request path
//! only through the store and the watermark file.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::retention::RetentionEnforcer;
use crate::rollup::RollupEngine;
use crate::watermark::WatermarkStore;

/// Recommended rollup cadence.
pub const DEFAULT_ROLLUP_INTERVAL: Duration = Duration::from_secs(60);

/// Recommended retention cadence.
pub const DEFAULT_RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Current wall-clock time in unix seconds.
fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Spawn the periodic rollup job.
///
/// # Parameters
///
/// - `engine` - Rollup engine to drive
/// - `watermark` - Persisted cursor read before and advanced after each
///   successful pass
/// - `every` - Pass cadence; the first pass runs immediately
///
/// # Returns
///
/// Returns the handle of the spawned task; the task loops until aborted.
pub fn spawn_rollup_job(
    engine: RollupEngine,
    watermark: WatermarkStore,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting rollup job every {}", humantime::format_duration(every));
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_rollup_pass(&engine, &watermark);
        }
    })
}

/// Run one rollup pass: load the watermark, aggregate, advance on success.
///
/// The watermark moves to the wall-clock captured at the start of the
/// pass, and only when every tier persisted without error; a failed pass
/// leaves it untouched so the same window is reprocessed on the next tick.
pub fn run_rollup_pass(engine: &RollupEngine, watermark: &WatermarkStore) {
    let started_wall = now_unix();
    let since = watermark.load(started_wall);
    let timer = std::time::Instant::now();

    match engine.run(since) {
        Ok(stats) => {
            info!(
                "rollup pass completed in {:.2?}: {} raw samples, {} rollup records, windows {:?}",
                timer.elapsed(),
                stats.raw_processed,
                stats.rollups_created,
                stats.windows_processed.iter().map(|w| w.as_str()).collect::<Vec<_>>(),
            );
            if let Err(err) = watermark.advance(started_wall, now_unix()) {
                error!("failed to persist watermark, next pass will reprocess: {err}");
            }
        }
        Err(err) => {
            error!("rollup pass failed, watermark not advanced: {err}");
        }
    }
}

/// Spawn the periodic retention job.
///
/// # Parameters
///
/// - `enforcer` - Retention enforcer to drive
/// - `every` - Sweep cadence; the first sweep runs immediately
///
/// # Returns
///
/// Returns the handle of the spawned task; the task loops until aborted.
pub fn spawn_retention_job(enforcer: RetentionEnforcer, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting retention job every {}", humantime::format_duration(every));
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_retention_sweep(&enforcer);
        }
    })
}

/// Run one retention sweep and log its outcome.
pub fn run_retention_sweep(enforcer: &RetentionEnforcer) {
    let timer = std::time::Instant::now();
    match enforcer.sweep(now_unix()) {
        Ok(stats) => {
            info!(
                "retention sweep completed in {:.2?}: {} raw, {} '1m', {} '5m', {} '1h' rows deleted",
                timer.elapsed(),
                stats.raw_deleted,
                stats.deleted_1m,
                stats.deleted_5m,
                stats.deleted_1h,
            );
        }
        Err(err) => {
            error!("retention sweep failed: {err}");
        }
    }
}
