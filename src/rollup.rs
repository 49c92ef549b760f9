//! Batch rollup computation across resolution tiers.
//!
//! A pass fetches every raw sample newer than the watermark once, then for
//! each tier groups the same set by (metric, bucket start, label
//! fingerprint) and persists one aggregate record per group. Persistence
//! is an upsert keyed on that identity, so re-running a pass over an
//! overlapping window recomputes records in place instead of duplicating
//! them.

use std::sync::Arc;

use fnv::FnvHashMap;
use tracing::{debug, error};

use crate::error::{PipelineError, PipelineResult};
use crate::labels::Labels;
use crate::store::{MetricStore, RawSample, RollupRecord};
use crate::timebucket::{bucket_start, Window, ALL_WINDOWS};

/// Outcome of one rollup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupStats {
    /// Raw samples fetched and considered by the pass.
    pub raw_processed: usize,
    /// Rollup records written across all tiers.
    pub rollups_created: usize,
    /// Tiers whose records were persisted without error.
    pub windows_processed: Vec<Window>,
}

/// Grouping identity within one tier.
#[derive(Debug, PartialEq, Eq, Hash)]
struct GroupKey {
    metric_name: String,
    bucket: i64,
    fingerprint: u64,
}

/// Running aggregate for one group.
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
    labels: Labels,
}

impl Accumulator {
    fn seed(value: f64, labels: Labels) -> Self {
        Self { min: value, max: value, sum: value, count: 1, labels }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }
}

/// Batch processor turning raw samples into per-tier rollup records.
#[derive(Clone)]
pub struct RollupEngine {
    store: Arc<dyn MetricStore>,
}

impl RollupEngine {
    /// Create an engine over the given store.
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Run one rollup pass over raw samples with `timestamp >= since`.
    ///
    /// Tiers are processed independently: a persistence failure in one tier
    /// is logged and does not stop the remaining tiers, but it fails the
    /// pass as a whole so the caller leaves the watermark unadvanced and
    /// the window is reprocessed on the next tick.
    ///
    /// # Parameters
    ///
    /// - `since` - Watermark, unix seconds; samples at or after it are
    ///   re-aggregated
    ///
    /// # Returns
    ///
    /// Returns per-pass statistics, or `StoreUnavailable` when any tier
    /// could not be persisted.
    pub fn run(&self, since: i64) -> PipelineResult<RollupStats> {
        let mut stats = RollupStats::default();

        let raw = self.store.scan_raw_since(since)?;
        stats.raw_processed = raw.len();
        if raw.is_empty() {
            return Ok(stats);
        }

        let mut failed_windows = Vec::new();
        for window in ALL_WINDOWS {
            let records = aggregate_window(&raw, window);
            let produced = records.len();
            match self.store.upsert_rollups(records) {
                Ok(written) => {
                    debug!("window {window}: {written} rollup records written");
                    stats.rollups_created += written;
                    stats.windows_processed.push(window);
                }
                Err(err) => {
                    error!("window {window}: failed to persist {produced} records: {err}");
                    failed_windows.push(window);
                }
            }
        }

        if failed_windows.is_empty() {
            Ok(stats)
        } else {
            Err(PipelineError::StoreUnavailable(format!(
                "rollup pass failed for windows {:?} ({} records written elsewhere)",
                failed_windows.iter().map(|w| w.as_str()).collect::<Vec<_>>(),
                stats.rollups_created,
            )))
        }
    }
}

/// Group raw samples into aggregate records for one tier.
///
/// # Parameters
///
/// - `raw` - Samples to aggregate, any order
/// - `window` - Tier to bucket by
///
/// # Returns
///
/// Returns one record per (metric, bucket, label set) group, ordered by
/// metric name then bucket start.
pub fn aggregate_window(raw: &[RawSample], window: Window) -> Vec<RollupRecord> {
    let mut groups: FnvHashMap<GroupKey, Accumulator> = FnvHashMap::default();

    for sample in raw {
        let key = GroupKey {
            metric_name: sample.metric_name.clone(),
            bucket: bucket_start(sample.timestamp, window),
            fingerprint: sample.labels.fingerprint(),
        };
        match groups.get_mut(&key) {
            Some(acc) => acc.push(sample.value),
            None => {
                groups.insert(key, Accumulator::seed(sample.value, sample.labels.clone()));
            }
        }
    }

    let mut records: Vec<RollupRecord> = groups
        .into_iter()
        .map(|(key, acc)| RollupRecord {
            metric_name: key.metric_name,
            window,
            start_time: key.bucket,
            end_time: key.bucket + window.duration_secs(),
            min: acc.min,
            max: acc.max,
            sum: acc.sum,
            avg: acc.sum / acc.count as f64,
            count: acc.count,
            labels: acc.labels,
        })
        .collect();
    records.sort_by(|a, b| (&a.metric_name, a.start_time).cmp(&(&b.metric_name, b.start_time)));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample(metric: &str, value: f64, ts: i64, labels: &[(&str, &str)]) -> RawSample {
        RawSample::new(metric, value, ts, Labels::normalize(labels.iter().copied()))
    }

    /// Test grouping and the aggregate invariants for a single bucket.
    #[test]
    fn test_aggregate_single_bucket() {
        let raw = vec![
            sample("cpu_usage", 1.0, 60, &[("host", "a")]),
            sample("cpu_usage", 3.0, 90, &[("host", "a")]),
            sample("cpu_usage", 2.0, 119, &[("host", "a")]),
        ];

        let records = aggregate_window(&raw, Window::Minutes1);
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.start_time, 60);
        assert_eq!(r.end_time, 120);
        assert_eq!(r.min, 1.0);
        assert_eq!(r.max, 3.0);
        assert_eq!(r.sum, 6.0);
        assert_eq!(r.count, 3);
        assert_eq!(r.avg, r.sum / r.count as f64);
        assert!(r.min <= r.avg && r.avg <= r.max);
    }

    /// Test that distinct label sets and metrics land in distinct groups.
    #[test]
    fn test_aggregate_groups_by_metric_and_labels() {
        let raw = vec![
            sample("cpu_usage", 1.0, 10, &[("host", "a")]),
            sample("cpu_usage", 2.0, 20, &[("host", "b")]),
            sample("mem_usage", 3.0, 30, &[("host", "a")]),
        ];

        let records = aggregate_window(&raw, Window::Minutes1);
        assert_eq!(records.len(), 3);
        for r in &records {
            assert_eq!(r.count, 1);
            assert_eq!(r.start_time, 0);
        }
    }

    /// Test that one sample set produces the expected counts per tier.
    #[test]
    fn test_run_processes_all_tiers() {
        let store = Arc::new(MemoryStore::new());
        // Two samples a minute apart: same 5m and 1h bucket, distinct 1m buckets.
        store.insert_raw(sample("cpu_usage", 1.0, 0, &[])).expect("insert");
        store.insert_raw(sample("cpu_usage", 2.0, 60, &[])).expect("insert");

        let engine = RollupEngine::new(store.clone());
        let stats = engine.run(0).expect("run");

        assert_eq!(stats.raw_processed, 2);
        assert_eq!(stats.rollups_created, 2 + 1 + 1);
        assert_eq!(stats.windows_processed, ALL_WINDOWS.to_vec());

        let hour = store
            .scan_rollups("cpu_usage", Window::Hours1, 0, 3600, &Labels::empty())
            .expect("scan");
        assert_eq!(hour.len(), 1);
        assert_eq!(hour[0].count, 2);
        assert_eq!(hour[0].avg, 1.5);
    }

    /// Test rollup idempotence: re-running over unchanged data leaves the
    /// same record set.
    #[test]
    fn test_run_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.insert_raw(sample("cpu_usage", 1.0, 0, &[("host", "a")])).expect("insert");
        store.insert_raw(sample("cpu_usage", 5.0, 30, &[("host", "a")])).expect("insert");

        let engine = RollupEngine::new(store.clone());
        engine.run(0).expect("first run");
        let first = store
            .scan_rollups("cpu_usage", Window::Minutes1, 0, 600, &Labels::empty())
            .expect("scan");

        engine.run(0).expect("second run");
        let second = store
            .scan_rollups("cpu_usage", Window::Minutes1, 0, 600, &Labels::empty())
            .expect("scan");

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }

    /// Test that an empty fetch returns zero counts without touching tiers.
    #[test]
    fn test_run_with_no_new_samples() {
        let store = Arc::new(MemoryStore::new());
        let engine = RollupEngine::new(store);

        let stats = engine.run(1_700_000_000).expect("run");
        assert_eq!(stats, RollupStats::default());
    }

    /// Test that the watermark bounds which samples are re-aggregated.
    #[test]
    fn test_run_honors_since() {
        let store = Arc::new(MemoryStore::new());
        store.insert_raw(sample("cpu_usage", 1.0, 100, &[])).expect("insert");
        store.insert_raw(sample("cpu_usage", 2.0, 200, &[])).expect("insert");

        let engine = RollupEngine::new(store);
        let stats = engine.run(150).expect("run");
        assert_eq!(stats.raw_processed, 1);
    }
}
