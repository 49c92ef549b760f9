//! Label-cardinality admission control.
//!
//! Bounds the number of distinct label combinations accepted per metric
//! name so one misbehaving producer cannot blow up the series index.
//!
//! The check is read-then-decide: it enumerates the combinations already
//! stored and compares against the limit before the insert happens. Under
//! concurrent ingestion of previously-unseen combinations for the same
//! metric the limit can be overshot; callers needing a hard bound must
//! serialize admissions per metric.

use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::labels::Labels;
use crate::store::MetricStore;

/// Default maximum distinct label combinations per metric.
pub const DEFAULT_CARDINALITY_LIMIT: usize = 100;

/// Admission gate in front of raw ingestion.
#[derive(Clone)]
pub struct CardinalityGuard {
    store: Arc<dyn MetricStore>,
    limit: usize,
}

impl CardinalityGuard {
    /// Create a guard over the given store.
    ///
    /// # Parameters
    ///
    /// - `store` - Store holding the already-accepted combinations
    /// - `limit` - Maximum distinct combinations per metric
    ///
    /// # Returns
    ///
    /// Returns a new `CardinalityGuard`.
    pub fn new(store: Arc<dyn MetricStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Configured per-metric limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Decide whether a sample with these labels may be ingested.
    ///
    /// A combination already stored for the metric is always admitted (it
    /// adds no cardinality), as is an empty label set. A new combination is
    /// admitted only while the metric's distinct-combination count is
    /// strictly below the limit.
    ///
    /// # Parameters
    ///
    /// - `metric_name` - Metric the sample belongs to
    /// - `labels` - Normalized labels of the incoming sample
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` when admitted, `CardinalityExceeded` when rejected.
    pub fn admit(&self, metric_name: &str, labels: &Labels) -> PipelineResult<()> {
        if labels.is_empty() {
            return Ok(());
        }

        let existing = self.store.distinct_label_sets(metric_name)?;
        if existing.iter().any(|set| set == labels) {
            return Ok(());
        }

        if existing.len() >= self.limit {
            return Err(PipelineError::CardinalityExceeded {
                metric: metric_name.to_string(),
                limit: self.limit,
            });
        }

        Ok(())
    }
}
