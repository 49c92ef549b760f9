//! # Metrics Rollup Library
//!
//! A library for multi-resolution time-series metric storage.
//!
//! This library provides components for:
//! - **Label-Cardinality Admission**: Bounds distinct label combinations per metric
//! - **Rollup Downsampling**: Periodically condenses raw samples into 1m/5m/1h tiers
//! - **Tier-Routed Queries**: Serves range queries from the cheapest adequate resolution
//! - **Gap Filling**: Regular-interval series with nulls for charting
//! - **Tiered Retention**: Per-resolution data expiry
//! - **Anomaly Detection**: Z-score outlier flagging over raw ranges
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use metrics_rollup_rs::{MemoryStore, RollupEngine, http::build_router};
//!
//! # async fn example() -> std::io::Result<()> {
//! // Create storage and the rollup engine
//! let store = Arc::new(MemoryStore::new());
//! let engine = RollupEngine::new(store.clone());
//!
//! // Build HTTP router with state
//! let state = metrics_rollup_rs::http::AppState::builder()
//!     .with_store(store)
//!     .build()?;
//! let app = build_router(state);
//! # Ok(())
//! # }
//! ```

pub mod anomaly;
pub mod cardinality;
pub mod config;
pub mod error;
pub mod gapfill;
pub mod generator;
pub mod http;
pub mod jobs;
pub mod labels;
pub mod query;
pub mod retention;
pub mod rollup;
pub mod store;
pub mod timebucket;
pub mod watermark;

// Re-export commonly used types for convenience
pub use anomaly::{AnomalyDetector, AnomalyReport};
pub use cardinality::CardinalityGuard;
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use labels::Labels;
pub use query::{QueryFunction, QueryRouter, Tier};
pub use retention::{RetentionEnforcer, RetentionPolicy};
pub use rollup::{RollupEngine, RollupStats};
pub use store::{MemoryStore, MetricStore, RawSample, RollupRecord};
pub use timebucket::Window;
pub use watermark::WatermarkStore;
