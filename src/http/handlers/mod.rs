//! HTTP handlers for different API endpoints.

pub mod anomaly;
pub mod health;
pub mod ingest;
pub mod metadata;
pub mod query;

// Re-export handlers for easier access
pub use anomaly::detect_anomalies;
pub use health::healthz;
pub use ingest::{import_historical, ingest_metric};
pub use metadata::{list_metrics, list_rollups, metric_info};
pub use query::{query_raw, query_rollup, query_routed};
