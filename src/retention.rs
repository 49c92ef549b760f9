//! Tiered data expiry.
//!
//! Raw samples and each rollup tier age out on their own schedule. A sweep
//! runs the four deletions independently: a failing tier is reported but
//! never stops the others, and no transaction ties the tiers together.
//! Cutoffs are exclusive on the delete side, so a row exactly at the
//! boundary survives.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{PipelineError, PipelineResult};
use crate::store::MetricStore;
use crate::timebucket::Window;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Per-tier retention ages, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub raw_days: u32,
    pub rollup_1m_days: u32,
    pub rollup_5m_days: u32,
    pub rollup_1h_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { raw_days: 3, rollup_1m_days: 7, rollup_5m_days: 30, rollup_1h_days: 90 }
    }
}

impl RetentionPolicy {
    /// Retention age for one rollup window.
    fn rollup_days(&self, window: Window) -> u32 {
        match window {
            Window::Minutes1 => self.rollup_1m_days,
            Window::Minutes5 => self.rollup_5m_days,
            Window::Hours1 => self.rollup_1h_days,
        }
    }
}

/// Deletion counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetentionStats {
    pub raw_deleted: u64,
    pub deleted_1m: u64,
    pub deleted_5m: u64,
    pub deleted_1h: u64,
}

impl RetentionStats {
    fn slot(&mut self, window: Window) -> &mut u64 {
        match window {
            Window::Minutes1 => &mut self.deleted_1m,
            Window::Minutes5 => &mut self.deleted_5m,
            Window::Hours1 => &mut self.deleted_1h,
        }
    }
}

/// Applies the retention policy against a store.
#[derive(Clone)]
pub struct RetentionEnforcer {
    store: Arc<dyn MetricStore>,
    policy: RetentionPolicy,
}

impl RetentionEnforcer {
    /// Create an enforcer with the given policy.
    ///
    /// # Parameters
    ///
    /// - `store` - Store to delete from
    /// - `policy` - Per-tier retention ages
    ///
    /// # Returns
    ///
    /// Returns a new `RetentionEnforcer`.
    pub fn new(store: Arc<dyn MetricStore>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// Delete everything older than its tier's cutoff.
    ///
    /// Each tier's deletion is attempted regardless of failures in the
    /// others; completed deletions stay in place. A failed tier fails the
    /// sweep as a whole after all tiers were attempted.
    ///
    /// # Parameters
    ///
    /// - `now` - Current wall-clock time, unix seconds
    ///
    /// # Returns
    ///
    /// Returns per-tier deletion counts, or `StoreUnavailable` when any
    /// tier's deletion failed.
    pub fn sweep(&self, now: i64) -> PipelineResult<RetentionStats> {
        let mut stats = RetentionStats::default();
        let mut failed: Vec<&'static str> = Vec::new();

        let raw_cutoff = now - i64::from(self.policy.raw_days) * SECS_PER_DAY;
        match self.store.delete_raw_before(raw_cutoff) {
            Ok(deleted) => stats.raw_deleted = deleted,
            Err(err) => {
                error!("retention sweep failed for raw samples: {err}");
                failed.push("raw");
            }
        }

        for window in [Window::Minutes1, Window::Minutes5, Window::Hours1] {
            let cutoff = now - i64::from(self.policy.rollup_days(window)) * SECS_PER_DAY;
            match self.store.delete_rollups_before(window, cutoff) {
                Ok(deleted) => *stats.slot(window) = deleted,
                Err(err) => {
                    error!("retention sweep failed for window {window}: {err}");
                    failed.push(window.as_str());
                }
            }
        }

        if failed.is_empty() {
            Ok(stats)
        } else {
            Err(PipelineError::StoreUnavailable(format!(
                "retention sweep failed for tiers {failed:?}"
            )))
        }
    }
}
