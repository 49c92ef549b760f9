//! In-memory metric store.
//!
//! Reference `MetricStore` backend keeping raw samples timestamp-sorted in
//! a vector and rollups in a hash map keyed by
//! (metric, window, bucket start, label fingerprint). Suitable for tests,
//! demos, and single-process deployments.

use std::collections::BTreeSet;
use std::sync::RwLock;

use fnv::FnvHashMap;

use crate::error::{PipelineError, PipelineResult};
use crate::labels::Labels;
use crate::store::{
    MetricDetail, MetricStore, MetricSummary, RawSample, RollupRecord, RollupSummary,
};
use crate::timebucket::Window;

/// Identity of one rollup row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RollupKey {
    metric_name: String,
    window: Window,
    start_time: i64,
    fingerprint: u64,
}

impl RollupKey {
    fn of(record: &RollupRecord) -> Self {
        Self {
            metric_name: record.metric_name.clone(),
            window: record.window,
            start_time: record.start_time,
            fingerprint: record.labels.fingerprint(),
        }
    }
}

/// Raw sample table: rows kept sorted by (timestamp, id).
#[derive(Default)]
struct RawTable {
    next_id: u64,
    rows: Vec<RawSample>,
}

impl RawTable {
    /// Insert one row at its sorted position and return the assigned id.
    fn insert(&mut self, mut sample: RawSample) -> u64 {
        self.next_id += 1;
        sample.id = self.next_id;
        let id = sample.id;
        let pos = self
            .rows
            .partition_point(|r| (r.timestamp, r.id) <= (sample.timestamp, sample.id));
        self.rows.insert(pos, sample);
        id
    }
}

/// In-memory storage for raw samples and rollup records.
pub struct MemoryStore {
    raw: RwLock<RawTable>,
    rollups: RwLock<FnvHashMap<RollupKey, RollupRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    ///
    /// # Returns
    ///
    /// Returns a `MemoryStore` with empty raw and rollup tables.
    pub fn new() -> Self {
        Self { raw: RwLock::new(RawTable::default()), rollups: RwLock::new(FnvHashMap::default()) }
    }
}

/// A poisoned lock means a writer panicked mid-update; surface it as a
/// store failure instead of unwrapping.
fn poisoned<T>(_: T) -> PipelineError {
    PipelineError::StoreUnavailable("memory store lock poisoned".to_string())
}

impl MetricStore for MemoryStore {
    fn insert_raw(&self, sample: RawSample) -> PipelineResult<u64> {
        let mut raw = self.raw.write().map_err(poisoned)?;
        Ok(raw.insert(sample))
    }

    fn insert_raw_bulk(&self, samples: Vec<RawSample>) -> PipelineResult<usize> {
        let mut raw = self.raw.write().map_err(poisoned)?;
        let count = samples.len();
        for sample in samples {
            raw.insert(sample);
        }
        Ok(count)
    }

    fn scan_raw(
        &self,
        metric_name: &str,
        start: i64,
        end: i64,
        labels: &Labels,
    ) -> PipelineResult<Vec<RawSample>> {
        let raw = self.raw.read().map_err(poisoned)?;
        let from = raw.rows.partition_point(|r| r.timestamp < start);
        let to = raw.rows.partition_point(|r| r.timestamp <= end);
        Ok(raw.rows[from..to]
            .iter()
            .filter(|r| r.metric_name == metric_name && r.labels.matches(labels))
            .cloned()
            .collect())
    }

    fn scan_raw_since(&self, since: i64) -> PipelineResult<Vec<RawSample>> {
        let raw = self.raw.read().map_err(poisoned)?;
        let from = raw.rows.partition_point(|r| r.timestamp < since);
        Ok(raw.rows[from..].to_vec())
    }

    fn upsert_rollups(&self, records: Vec<RollupRecord>) -> PipelineResult<usize> {
        let mut rollups = self.rollups.write().map_err(poisoned)?;
        let count = records.len();
        for record in records {
            rollups.insert(RollupKey::of(&record), record);
        }
        Ok(count)
    }

    fn scan_rollups(
        &self,
        metric_name: &str,
        window: Window,
        start: i64,
        end: i64,
        labels: &Labels,
    ) -> PipelineResult<Vec<RollupRecord>> {
        let rollups = self.rollups.read().map_err(poisoned)?;
        let mut rows: Vec<RollupRecord> = rollups
            .values()
            .filter(|r| {
                r.metric_name == metric_name
                    && r.window == window
                    && r.start_time >= start
                    && r.end_time <= end
                    && r.labels.matches(labels)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.start_time);
        Ok(rows)
    }

    fn delete_raw_before(&self, cutoff: i64) -> PipelineResult<u64> {
        let mut raw = self.raw.write().map_err(poisoned)?;
        // Rows are timestamp-sorted: everything before the cutoff index goes.
        let split = raw.rows.partition_point(|r| r.timestamp < cutoff);
        raw.rows.drain(..split);
        Ok(split as u64)
    }

    fn delete_rollups_before(&self, window: Window, cutoff: i64) -> PipelineResult<u64> {
        let mut rollups = self.rollups.write().map_err(poisoned)?;
        let before = rollups.len();
        rollups.retain(|key, _| key.window != window || key.start_time >= cutoff);
        Ok((before - rollups.len()) as u64)
    }

    fn distinct_label_sets(&self, metric_name: &str) -> PipelineResult<Vec<Labels>> {
        let raw = self.raw.read().map_err(poisoned)?;
        let distinct: BTreeSet<Labels> = raw
            .rows
            .iter()
            .filter(|r| r.metric_name == metric_name)
            .map(|r| r.labels.clone())
            .collect();
        Ok(distinct.into_iter().collect())
    }

    fn list_metrics(&self, search: Option<&str>) -> PipelineResult<Vec<MetricSummary>> {
        let raw = self.raw.read().map_err(poisoned)?;
        let needle = search.map(str::to_lowercase);

        let mut by_name: FnvHashMap<&str, MetricSummary> = FnvHashMap::default();
        for row in &raw.rows {
            if let Some(needle) = &needle {
                if !row.metric_name.to_lowercase().contains(needle) {
                    continue;
                }
            }
            let entry = by_name.entry(row.metric_name.as_str()).or_insert_with(|| MetricSummary {
                metric_name: row.metric_name.clone(),
                sample_count: 0,
                first_seen: row.timestamp,
                last_seen: row.timestamp,
            });
            entry.sample_count += 1;
            entry.first_seen = entry.first_seen.min(row.timestamp);
            entry.last_seen = entry.last_seen.max(row.timestamp);
        }

        let mut summaries: Vec<MetricSummary> = by_name.into_values().collect();
        summaries.sort_by(|a, b| a.metric_name.cmp(&b.metric_name));
        Ok(summaries)
    }

    fn metric_detail(&self, metric_name: &str) -> PipelineResult<Option<MetricDetail>> {
        let raw = self.raw.read().map_err(poisoned)?;
        let rows: Vec<&RawSample> =
            raw.rows.iter().filter(|r| r.metric_name == metric_name).collect();
        let Some(first) = rows.first() else {
            return Ok(None);
        };

        let mut detail = MetricDetail {
            metric_name: metric_name.to_string(),
            sample_count: 0,
            first_seen: first.timestamp,
            last_seen: first.timestamp,
            label_keys: Vec::new(),
            unique_label_combinations: 0,
            min_value: first.value,
            max_value: first.value,
            avg_value: 0.0,
        };

        let mut sum = 0.0;
        let mut keys = BTreeSet::new();
        let mut combinations = BTreeSet::new();
        for row in &rows {
            detail.sample_count += 1;
            detail.first_seen = detail.first_seen.min(row.timestamp);
            detail.last_seen = detail.last_seen.max(row.timestamp);
            detail.min_value = detail.min_value.min(row.value);
            detail.max_value = detail.max_value.max(row.value);
            sum += row.value;
            keys.extend(row.labels.keys().cloned());
            combinations.insert(row.labels.clone());
        }
        detail.avg_value = sum / detail.sample_count as f64;
        detail.label_keys = keys.into_iter().collect();
        detail.unique_label_combinations = combinations.len();
        Ok(Some(detail))
    }

    fn rollup_summaries(&self, metric_name: Option<&str>) -> PipelineResult<Vec<RollupSummary>> {
        let rollups = self.rollups.read().map_err(poisoned)?;

        let mut by_group: FnvHashMap<(&str, Window), RollupSummary> = FnvHashMap::default();
        for record in rollups.values() {
            if metric_name.is_some_and(|name| name != record.metric_name) {
                continue;
            }
            let entry = by_group
                .entry((record.metric_name.as_str(), record.window))
                .or_insert_with(|| RollupSummary {
                    metric_name: record.metric_name.clone(),
                    window: record.window,
                    total_rollups: 0,
                    earliest_time: record.start_time,
                    latest_time: record.end_time,
                });
            entry.total_rollups += 1;
            entry.earliest_time = entry.earliest_time.min(record.start_time);
            entry.latest_time = entry.latest_time.max(record.end_time);
        }

        let mut summaries: Vec<RollupSummary> = by_group.into_values().collect();
        summaries.sort_by(|a, b| (&a.metric_name, a.window).cmp(&(&b.metric_name, b.window)));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(metric: &str, value: f64, ts: i64, labels: &[(&str, &str)]) -> RawSample {
        RawSample::new(metric, value, ts, Labels::normalize(labels.iter().copied()))
    }

    /// Test point insert, id assignment, and sorted range scans.
    #[test]
    fn test_insert_and_scan_raw() {
        let store = MemoryStore::new();

        // Insert out of timestamp order.
        store.insert_raw(sample("cpu_usage", 2.0, 200, &[("host", "a")])).expect("insert");
        let id = store.insert_raw(sample("cpu_usage", 1.0, 100, &[("host", "a")])).expect("insert");
        assert_eq!(id, 2);
        store.insert_raw(sample("other_metric", 9.0, 150, &[])).expect("insert");

        let rows = store.scan_raw("cpu_usage", 0, 300, &Labels::empty()).expect("scan");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, 100);
        assert_eq!(rows[1].timestamp, 200);

        // Inclusive bounds.
        let rows = store.scan_raw("cpu_usage", 100, 200, &Labels::empty()).expect("scan");
        assert_eq!(rows.len(), 2);
        let rows = store.scan_raw("cpu_usage", 101, 199, &Labels::empty()).expect("scan");
        assert!(rows.is_empty());
    }

    /// Test exact-match label filtering on raw scans.
    #[test]
    fn test_scan_raw_label_filter() {
        let store = MemoryStore::new();
        store.insert_raw(sample("cpu_usage", 1.0, 100, &[("host", "a")])).expect("insert");
        store.insert_raw(sample("cpu_usage", 2.0, 200, &[("host", "b")])).expect("insert");
        store.insert_raw(sample("cpu_usage", 3.0, 300, &[])).expect("insert");

        let filter = Labels::normalize([("host", "a")]);
        let rows = store.scan_raw("cpu_usage", 0, 400, &filter).expect("scan");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 1.0);
    }

    /// Test that rollup upsert replaces the record under the same key.
    #[test]
    fn test_upsert_rollups_replaces() {
        let store = MemoryStore::new();
        let labels = Labels::normalize([("host", "a")]);
        let record = RollupRecord {
            metric_name: "cpu_usage".to_string(),
            window: Window::Minutes1,
            start_time: 60,
            end_time: 120,
            min: 1.0,
            max: 3.0,
            sum: 4.0,
            avg: 2.0,
            count: 2,
            labels: labels.clone(),
        };
        store.upsert_rollups(vec![record.clone()]).expect("upsert");

        // Recompute with more data, same key.
        let recomputed = RollupRecord { min: 1.0, max: 5.0, sum: 9.0, avg: 3.0, count: 3, ..record };
        store.upsert_rollups(vec![recomputed.clone()]).expect("upsert");

        let rows = store
            .scan_rollups("cpu_usage", Window::Minutes1, 0, 300, &Labels::empty())
            .expect("scan");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], recomputed);
    }

    /// Test expiry deletes are exclusive at the cutoff.
    #[test]
    fn test_delete_before_cutoff_exclusive() {
        let store = MemoryStore::new();
        store.insert_raw(sample("m", 1.0, 99, &[])).expect("insert");
        store.insert_raw(sample("m", 2.0, 100, &[])).expect("insert");
        store.insert_raw(sample("m", 3.0, 101, &[])).expect("insert");

        let deleted = store.delete_raw_before(100).expect("delete");
        assert_eq!(deleted, 1);

        let rows = store.scan_raw("m", 0, 200, &Labels::empty()).expect("scan");
        // The row exactly at the cutoff survives.
        assert_eq!(rows.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![100, 101]);
    }

    /// Test distinct label-set enumeration.
    #[test]
    fn test_distinct_label_sets() {
        let store = MemoryStore::new();
        store.insert_raw(sample("m", 1.0, 1, &[("a", "1")])).expect("insert");
        store.insert_raw(sample("m", 2.0, 2, &[("a", "1")])).expect("insert");
        store.insert_raw(sample("m", 3.0, 3, &[("a", "2")])).expect("insert");
        store.insert_raw(sample("other", 4.0, 4, &[("a", "3")])).expect("insert");

        let sets = store.distinct_label_sets("m").expect("distinct");
        assert_eq!(sets.len(), 2);
    }

    /// Test metric listing with search and aggregates.
    #[test]
    fn test_list_metrics_and_detail() {
        let store = MemoryStore::new();
        store.insert_raw(sample("cpu_usage", 10.0, 100, &[("host", "a")])).expect("insert");
        store.insert_raw(sample("cpu_usage", 20.0, 300, &[("host", "b")])).expect("insert");
        store.insert_raw(sample("mem_usage", 5.0, 200, &[])).expect("insert");

        let all = store.list_metrics(None).expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].metric_name, "cpu_usage");
        assert_eq!(all[0].sample_count, 2);
        assert_eq!(all[0].first_seen, 100);
        assert_eq!(all[0].last_seen, 300);

        let cpu_only = store.list_metrics(Some("CPU")).expect("list");
        assert_eq!(cpu_only.len(), 1);

        let detail = store.metric_detail("cpu_usage").expect("detail").expect("exists");
        assert_eq!(detail.sample_count, 2);
        assert_eq!(detail.min_value, 10.0);
        assert_eq!(detail.max_value, 20.0);
        assert_eq!(detail.avg_value, 15.0);
        assert_eq!(detail.label_keys, vec!["host".to_string()]);
        assert_eq!(detail.unique_label_combinations, 2);

        assert!(store.metric_detail("missing").expect("detail").is_none());
    }

    /// Test rollup inventory grouping and ordering.
    #[test]
    fn test_rollup_summaries() {
        let store = MemoryStore::new();
        let mk = |window: Window, start: i64| RollupRecord {
            metric_name: "cpu_usage".to_string(),
            window,
            start_time: start,
            end_time: start + window.duration_secs(),
            min: 0.0,
            max: 0.0,
            sum: 0.0,
            avg: 0.0,
            count: 1,
            labels: Labels::empty(),
        };
        store
            .upsert_rollups(vec![
                mk(Window::Minutes1, 0),
                mk(Window::Minutes1, 60),
                mk(Window::Hours1, 0),
            ])
            .expect("upsert");

        let summaries = store.rollup_summaries(Some("cpu_usage")).expect("summaries");
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].window, Window::Minutes1);
        assert_eq!(summaries[0].total_rollups, 2);
        assert_eq!(summaries[0].earliest_time, 0);
        assert_eq!(summaries[0].latest_time, 120);

        assert!(store.rollup_summaries(Some("missing")).expect("summaries").is_empty());
    }
}
