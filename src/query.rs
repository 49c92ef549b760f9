//! Multi-tier query routing and aggregation functions.
//!
//! A range query picks the coarsest resolution tier that still meets the
//! resolution budget of the requested range, fetches the tier's rows with
//! exact label filtering, and applies the requested aggregation or
//! transform. Absence of data is a valid, empty result, never an error.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::labels::Labels;
use crate::store::{MetricStore, RollupRecord};
use crate::timebucket::Window;

/// One point of a query result series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    /// Unix timestamp in seconds. For rollup sources this is the bucket
    /// start.
    pub timestamp: i64,
    pub value: f64,
}

/// Aggregation/transform applied to a fetched series.
///
/// Raw points carry no distribution, so `sum`/`avg`/`min`/`max` pass a raw
/// value through unchanged; against a rollup source they select the
/// correspondingly named pre-computed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryFunction {
    Raw,
    Sum,
    Avg,
    Min,
    Max,
    Count,
    Rate,
}

impl QueryFunction {
    /// Canonical function name as used in the API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Rate => "rate",
        }
    }
}

impl fmt::Display for QueryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution tier a query is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Unaggregated samples.
    Raw,
    /// Pre-computed rollups at the given window.
    Rollup(Window),
}

impl Tier {
    /// Canonical tier name as reported to callers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Rollup(window) => window.as_str(),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the cheapest adequate tier for a requested range.
///
/// Boundaries are half-open: a range of exactly one hour already selects
/// the 1m tier, exactly one day the 5m tier, exactly seven days the 1h
/// tier.
///
/// # Parameters
///
/// - `start` - Range start, unix seconds
/// - `end` - Range end, unix seconds
///
/// # Returns
///
/// Returns the tier the query should be served from.
pub fn select_tier(start: i64, end: i64) -> Tier {
    const HOUR: i64 = 60 * 60;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;

    let range = end.saturating_sub(start);
    if range < HOUR {
        Tier::Raw
    } else if range < DAY {
        Tier::Rollup(Window::Minutes1)
    } else if range < WEEK {
        Tier::Rollup(Window::Minutes5)
    } else {
        Tier::Rollup(Window::Hours1)
    }
}

/// Result of a routed query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Tier the points were read from.
    pub tier: Tier,
    /// Function applied to produce the values.
    pub function: QueryFunction,
    pub points: Vec<DataPoint>,
}

/// Router reading raw or rollup rows and applying query functions.
#[derive(Clone)]
pub struct QueryRouter {
    store: Arc<dyn MetricStore>,
}

impl QueryRouter {
    /// Create a router over the given store.
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Execute a routed range query.
    ///
    /// # Parameters
    ///
    /// - `metric_name` - Metric to query
    /// - `start` - Range start, unix seconds (inclusive)
    /// - `end` - Range end, unix seconds (inclusive)
    /// - `labels` - Exact-match label filter
    /// - `function` - Aggregation/transform to apply
    ///
    /// # Returns
    ///
    /// Returns the selected tier and the transformed points; an empty
    /// series when nothing matches.
    pub fn query(
        &self,
        metric_name: &str,
        start: i64,
        end: i64,
        labels: &Labels,
        function: QueryFunction,
    ) -> PipelineResult<QueryOutcome> {
        let tier = select_tier(start, end);
        let points = match tier {
            Tier::Raw => {
                let rows = self.store.scan_raw(metric_name, start, end, labels)?;
                let base: Vec<DataPoint> = rows
                    .iter()
                    .map(|r| DataPoint { timestamp: r.timestamp, value: r.value })
                    .collect();
                apply_raw(&base, function)
            }
            Tier::Rollup(window) => {
                let rows = self.store.scan_rollups(metric_name, window, start, end, labels)?;
                apply_rollup(&rows, function)
            }
        };
        Ok(QueryOutcome { tier, function, points })
    }

    /// Fetch raw points for one metric without a transform. Backs the
    /// direct raw-query endpoint and the gap filler.
    pub fn query_raw(
        &self,
        metric_name: &str,
        start: i64,
        end: i64,
        labels: &Labels,
    ) -> PipelineResult<Vec<DataPoint>> {
        let rows = self.store.scan_raw(metric_name, start, end, labels)?;
        Ok(rows.iter().map(|r| DataPoint { timestamp: r.timestamp, value: r.value }).collect())
    }

    /// Fetch rollup records for one metric at an explicit window. Backs the
    /// direct rollup-query endpoint.
    pub fn query_rollups(
        &self,
        metric_name: &str,
        window: Window,
        start: i64,
        end: i64,
        labels: &Labels,
    ) -> PipelineResult<Vec<RollupRecord>> {
        self.store.scan_rollups(metric_name, window, start, end, labels)
    }
}

/// Apply a function to a raw-sourced series.
fn apply_raw(points: &[DataPoint], function: QueryFunction) -> Vec<DataPoint> {
    match function {
        // A raw point has no distribution to aggregate further.
        QueryFunction::Raw
        | QueryFunction::Sum
        | QueryFunction::Avg
        | QueryFunction::Min
        | QueryFunction::Max => points.to_vec(),
        QueryFunction::Count => {
            points.iter().map(|p| DataPoint { timestamp: p.timestamp, value: 1.0 }).collect()
        }
        QueryFunction::Rate => rate(points),
    }
}

/// Apply a function to a rollup-sourced series.
fn apply_rollup(rows: &[RollupRecord], function: QueryFunction) -> Vec<DataPoint> {
    let select = |field: fn(&RollupRecord) -> f64| -> Vec<DataPoint> {
        rows.iter().map(|r| DataPoint { timestamp: r.start_time, value: field(r) }).collect()
    };

    match function {
        // The average is the representative value of a bucket.
        QueryFunction::Raw | QueryFunction::Avg => select(|r| r.avg),
        QueryFunction::Sum => select(|r| r.sum),
        QueryFunction::Min => select(|r| r.min),
        QueryFunction::Max => select(|r| r.max),
        QueryFunction::Count => select(|r| r.count as f64),
        QueryFunction::Rate => rate(&select(|r| r.avg)),
    }
}

/// Per-second delta transform.
///
/// Emits `(value[i] - value[i-1]) / (t[i] - t[i-1])` for consecutive
/// pairs; pairs with zero time delta are skipped rather than divided by
/// zero. Needs at least two points to produce anything.
fn rate(points: &[DataPoint]) -> Vec<DataPoint> {
    points
        .windows(2)
        .filter(|pair| pair[1].timestamp != pair[0].timestamp)
        .map(|pair| DataPoint {
            timestamp: pair[1].timestamp,
            value: (pair[1].value - pair[0].value) / (pair[1].timestamp - pair[0].timestamp) as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RawSample};

    const HOUR: i64 = 3600;
    const DAY: i64 = 24 * HOUR;

    /// Test the tier-selection boundary cases.
    #[test]
    fn test_select_tier_boundaries() {
        assert_eq!(select_tier(0, 59 * 60), Tier::Raw);
        assert_eq!(select_tier(0, HOUR), Tier::Rollup(Window::Minutes1));
        assert_eq!(select_tier(0, DAY - 1), Tier::Rollup(Window::Minutes1));
        assert_eq!(select_tier(0, DAY), Tier::Rollup(Window::Minutes5));
        assert_eq!(select_tier(0, 7 * DAY - 1), Tier::Rollup(Window::Minutes5));
        assert_eq!(select_tier(0, 7 * DAY), Tier::Rollup(Window::Hours1));
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (ts, value) in [(10, 4.0), (20, 8.0), (30, 2.0)] {
            store
                .insert_raw(RawSample::new("cpu_usage", value, ts, Labels::empty()))
                .expect("insert");
        }
        store
    }

    /// Test raw-tier function semantics: pass-through, count, rate.
    #[test]
    fn test_raw_tier_functions() {
        let router = QueryRouter::new(seeded_store());
        let labels = Labels::empty();

        let out = router.query("cpu_usage", 0, 100, &labels, QueryFunction::Avg).expect("query");
        assert_eq!(out.tier, Tier::Raw);
        assert_eq!(out.points.iter().map(|p| p.value).collect::<Vec<_>>(), vec![4.0, 8.0, 2.0]);

        let out = router.query("cpu_usage", 0, 100, &labels, QueryFunction::Count).expect("query");
        assert!(out.points.iter().all(|p| p.value == 1.0));

        let out = router.query("cpu_usage", 0, 100, &labels, QueryFunction::Rate).expect("query");
        assert_eq!(out.points.len(), 2);
        assert_eq!(out.points[0], DataPoint { timestamp: 20, value: 0.4 });
        assert_eq!(out.points[1], DataPoint { timestamp: 30, value: -0.6 });
    }

    /// Test rollup-tier function semantics against stored aggregates.
    #[test]
    fn test_rollup_tier_functions() {
        let store = Arc::new(MemoryStore::new());
        let mk = |start: i64, min: f64, max: f64, sum: f64, count: u64| RollupRecord {
            metric_name: "cpu_usage".to_string(),
            window: Window::Minutes1,
            start_time: start,
            end_time: start + 60,
            min,
            max,
            sum,
            avg: sum / count as f64,
            count,
            labels: Labels::empty(),
        };
        store.upsert_rollups(vec![mk(0, 1.0, 5.0, 6.0, 2), mk(60, 2.0, 4.0, 12.0, 3)]).expect("upsert");

        let router = QueryRouter::new(store);
        let labels = Labels::empty();
        // A 2-hour range routes to the 1m tier.
        let range = (0, 2 * HOUR);

        let values = |function| {
            router
                .query("cpu_usage", range.0, range.1, &labels, function)
                .expect("query")
                .points
                .iter()
                .map(|p| p.value)
                .collect::<Vec<_>>()
        };

        assert_eq!(values(QueryFunction::Raw), vec![3.0, 4.0]);
        assert_eq!(values(QueryFunction::Avg), vec![3.0, 4.0]);
        assert_eq!(values(QueryFunction::Sum), vec![6.0, 12.0]);
        assert_eq!(values(QueryFunction::Min), vec![1.0, 2.0]);
        assert_eq!(values(QueryFunction::Max), vec![5.0, 4.0]);
        assert_eq!(values(QueryFunction::Count), vec![2.0, 3.0]);
    }

    /// Test that rate skips zero-time-delta pairs and never divides by zero.
    #[test]
    fn test_rate_skips_zero_delta() {
        let points = vec![
            DataPoint { timestamp: 10, value: 1.0 },
            DataPoint { timestamp: 10, value: 5.0 },
            DataPoint { timestamp: 20, value: 7.0 },
        ];
        let rates = rate(&points);
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0], DataPoint { timestamp: 20, value: 0.2 });

        // Fewer than two points yields nothing.
        assert!(rate(&points[..1]).is_empty());
        assert!(rate(&[]).is_empty());
    }

    /// Test that a query matching nothing returns an empty series.
    #[test]
    fn test_no_rows_is_empty_not_error() {
        let router = QueryRouter::new(Arc::new(MemoryStore::new()));
        let out = router
            .query("missing_metric", 0, 100, &Labels::empty(), QueryFunction::Avg)
            .expect("query");
        assert!(out.points.is_empty());
    }

    /// Test that unknown function names fail to deserialize.
    #[test]
    fn test_function_deserialization() {
        let f: QueryFunction = serde_json::from_str("\"rate\"").expect("valid function");
        assert_eq!(f, QueryFunction::Rate);
        assert!(serde_json::from_str::<QueryFunction>("\"median\"").is_err());
    }
}
