//! Metric storage abstractions and data model.
//!
//! This module defines the rows the pipeline reads and writes and the
//! `MetricStore` trait every backend must provide: point and bulk inserts,
//! time-range scans with exact label filtering, keyed rollup upserts, bulk
//! expiry deletes, and the metadata aggregates used for introspection.

pub mod memory;

// Re-export main implementations
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::labels::Labels;
use crate::timebucket::Window;

/// A single ingested metric sample.
///
/// Immutable once stored: created by ingestion, deleted only by retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Row id, assigned by the store on insert.
    #[serde(default)]
    pub id: u64,
    pub metric_name: String,
    pub value: f64,
    /// Unix timestamp in seconds, UTC.
    pub timestamp: i64,
    pub labels: Labels,
    pub tenant_id: Option<String>,
}

impl RawSample {
    /// Create a sample ready for insertion (id assigned by the store).
    ///
    /// # Parameters
    ///
    /// - `metric_name` - Metric the sample belongs to
    /// - `value` - Sample value
    /// - `timestamp` - Unix timestamp in seconds
    /// - `labels` - Normalized label set
    ///
    /// # Returns
    ///
    /// Returns a new `RawSample` with no tenant and id 0.
    pub fn new(metric_name: impl Into<String>, value: f64, timestamp: i64, labels: Labels) -> Self {
        Self { id: 0, metric_name: metric_name.into(), value, timestamp, labels, tenant_id: None }
    }

    /// Attach a tenant identifier.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

/// One aggregated bucket for a (metric, window, label set) group.
///
/// `start_time` is always window-aligned and
/// `end_time = start_time + window duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupRecord {
    pub metric_name: String,
    pub window: Window,
    pub start_time: i64,
    pub end_time: i64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub avg: f64,
    pub count: u64,
    pub labels: Labels,
}

/// Per-metric listing entry (sample count plus observed time span).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric_name: String,
    pub sample_count: u64,
    pub first_seen: i64,
    pub last_seen: i64,
}

/// Detailed metadata for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDetail {
    pub metric_name: String,
    pub sample_count: u64,
    pub first_seen: i64,
    pub last_seen: i64,
    /// All label keys ever observed on this metric, sorted.
    pub label_keys: Vec<String>,
    /// Count of distinct normalized label combinations.
    pub unique_label_combinations: usize,
    pub min_value: f64,
    pub max_value: f64,
    pub avg_value: f64,
}

/// Per (metric, window) rollup inventory entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupSummary {
    pub metric_name: String,
    pub window: Window,
    pub total_rollups: u64,
    pub earliest_time: i64,
    pub latest_time: i64,
}

/// Storage abstraction for the metrics pipeline.
///
/// Implementations must be safe for concurrent readers and writers; the
/// pipeline runs ingestion, queries, and the background jobs against the
/// same store. Failures map to `PipelineError::StoreUnavailable`; backends
/// with real I/O should bound every call with a timeout and surface the
/// timeout the same way, so no pipeline operation blocks indefinitely.
pub trait MetricStore: Send + Sync {
    /// Insert one raw sample.
    ///
    /// # Parameters
    ///
    /// - `sample` - Sample to store; its `id` field is ignored
    ///
    /// # Returns
    ///
    /// Returns the id assigned to the stored row.
    fn insert_raw(&self, sample: RawSample) -> PipelineResult<u64>;

    /// Insert a batch of raw samples.
    ///
    /// # Parameters
    ///
    /// - `samples` - Samples to store; `id` fields are ignored
    ///
    /// # Returns
    ///
    /// Returns the number of rows stored.
    fn insert_raw_bulk(&self, samples: Vec<RawSample>) -> PipelineResult<usize>;

    /// Scan raw samples for one metric within `[start, end]` (inclusive),
    /// exact-matching every requested label pair, ascending by timestamp.
    fn scan_raw(
        &self,
        metric_name: &str,
        start: i64,
        end: i64,
        labels: &Labels,
    ) -> PipelineResult<Vec<RawSample>>;

    /// Scan all raw samples with `timestamp >= since`, ascending. Feeds the
    /// rollup pass.
    fn scan_raw_since(&self, since: i64) -> PipelineResult<Vec<RawSample>>;

    /// Insert or replace rollup records.
    ///
    /// Keyed on (metric, window, start_time, label fingerprint): an existing
    /// record under the same key is overwritten with the recomputed
    /// aggregate, so re-running a rollup pass is idempotent.
    ///
    /// # Returns
    ///
    /// Returns the number of records written (inserts plus replacements).
    fn upsert_rollups(&self, records: Vec<RollupRecord>) -> PipelineResult<usize>;

    /// Scan rollup records for one metric and window whose buckets lie
    /// within `[start, end]`, exact-matching every requested label pair,
    /// ascending by bucket start.
    fn scan_rollups(
        &self,
        metric_name: &str,
        window: Window,
        start: i64,
        end: i64,
        labels: &Labels,
    ) -> PipelineResult<Vec<RollupRecord>>;

    /// Delete raw samples strictly older than `cutoff`. Rows exactly at the
    /// cutoff are retained.
    ///
    /// # Returns
    ///
    /// Returns the number of rows deleted.
    fn delete_raw_before(&self, cutoff: i64) -> PipelineResult<u64>;

    /// Delete rollup records of one window with `start_time` strictly older
    /// than `cutoff`.
    ///
    /// # Returns
    ///
    /// Returns the number of rows deleted.
    fn delete_rollups_before(&self, window: Window, cutoff: i64) -> PipelineResult<u64>;

    /// Enumerate the distinct normalized label combinations stored for one
    /// metric. Feeds cardinality admission.
    fn distinct_label_sets(&self, metric_name: &str) -> PipelineResult<Vec<Labels>>;

    /// List stored metrics with sample counts and observed time spans,
    /// optionally filtered by a case-insensitive substring, ordered by name.
    fn list_metrics(&self, search: Option<&str>) -> PipelineResult<Vec<MetricSummary>>;

    /// Detailed metadata for one metric, or `None` when it has no samples.
    fn metric_detail(&self, metric_name: &str) -> PipelineResult<Option<MetricDetail>>;

    /// Per (metric, window) rollup inventory, optionally filtered by metric,
    /// ordered by metric then window.
    fn rollup_summaries(&self, metric_name: Option<&str>) -> PipelineResult<Vec<RollupSummary>>;
}
