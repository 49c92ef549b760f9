//! Typed failure kinds shared across the pipeline.
//!
//! Every public operation returns these instead of transport-specific
//! errors, so callers (HTTP layer, background jobs) decide how to surface
//! them.

use thiserror::Error;

/// Errors produced by the metrics pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unknown rollup window name. User input error, never retried.
    #[error("unsupported window: {0}")]
    InvalidWindow(String),

    /// Admission rejected: the metric already carries `limit` distinct
    /// label combinations. Surfaced to the caller, never retried.
    #[error("cardinality limit of {limit} exceeded for metric '{metric}'")]
    CardinalityExceeded { metric: String, limit: usize },

    /// The backing store failed. Ingestion surfaces this; rollup and
    /// retention passes abort without advancing their cursor and wait for
    /// the next scheduled tick.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Convenience alias used throughout the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;
