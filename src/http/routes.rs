//! HTTP routing configuration for all API endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::handlers::*;
use crate::http::state::AppState;

/// Build the Axum router with all API endpoints.
///
/// # Parameters
///
/// - `state` - Application state containing configuration and dependencies
///
/// # Returns
///
/// Returns configured Axum `Router` with all pipeline endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        // Ingestion
        .route("/metrics/ingest", post(ingest_metric))
        .route("/backfill/import", post(import_historical))
        // Query API
        .route("/query", post(query_routed))
        .route("/query/raw", get(query_raw))
        .route("/query/rollup", get(query_rollup))
        // Anomaly detection
        .route("/anomaly/detect", get(detect_anomalies))
        // Metadata
        .route("/metrics", get(list_metrics))
        .route("/metrics/{name}/info", get(metric_info))
        .route("/rollups", get(list_rollups))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum_test::TestServer;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn server() -> TestServer {
        let state = AppState::builder()
            .with_store(Arc::new(MemoryStore::new()))
            .build()
            .expect("valid state");
        TestServer::new(build_router(state)).expect("test server")
    }

    /// Test the health endpoint.
    #[tokio::test]
    async fn test_healthz() {
        let server = server();
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("ok");
    }

    /// Test the ingest-then-query round trip through the HTTP surface.
    #[tokio::test]
    async fn test_ingest_and_query_raw() {
        let server = server();

        let response = server
            .post("/metrics/ingest")
            .json(&json!({
                "metric_name": "cpu_usage",
                "value": 75.5,
                "timestamp": "2024-06-01T12:00:00Z",
                "labels": {"host": "server1"}
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["metric_id"], 1);

        let response = server
            .get("/query/raw")
            .add_query_param("metric_name", "cpu_usage")
            .add_query_param("start_time", "2024-06-01T11:00:00Z")
            .add_query_param("end_time", "2024-06-01T13:00:00Z")
            .add_query_param("labels", r#"{"host": "server1"}"#)
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_points"], 1);
        assert_eq!(body["points"][0]["value"], 75.5);
    }

    /// Test that ingestion rejects over-limit label combinations with 400.
    #[tokio::test]
    async fn test_ingest_cardinality_rejection() {
        use crate::config::PipelineConfig;

        let config = PipelineConfig { cardinality_limit: 1, ..PipelineConfig::default() };
        let state = AppState::builder()
            .with_store(Arc::new(MemoryStore::new()))
            .with_config(config)
            .build()
            .expect("valid state");
        let server = TestServer::new(build_router(state)).expect("test server");

        let ingest = |host: &str| {
            json!({
                "metric_name": "cpu_usage",
                "value": 1.0,
                "timestamp": "2024-06-01T12:00:00Z",
                "labels": {"host": host}
            })
        };

        server.post("/metrics/ingest").json(&ingest("a")).await.assert_status_ok();

        let response = server.post("/metrics/ingest").json(&ingest("b")).await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert!(body["detail"].as_str().expect("detail").contains("cardinality limit"));
    }

    /// Test that an unknown rollup window surfaces as 400.
    #[tokio::test]
    async fn test_query_rollup_invalid_window() {
        let server = server();
        let response = server
            .get("/query/rollup")
            .add_query_param("metric_name", "cpu_usage")
            .add_query_param("start_time", "2024-06-01T00:00:00Z")
            .add_query_param("end_time", "2024-06-02T00:00:00Z")
            .add_query_param("window", "15m")
            .await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["detail"], "unsupported window: 15m");
    }

    /// Test that the routed query reports the serving tier.
    #[tokio::test]
    async fn test_query_routed_reports_tier() {
        let server = server();
        let response = server
            .post("/query")
            .json(&json!({
                "metric_name": "cpu_usage",
                "start_time": "2024-06-01T00:00:00Z",
                "end_time": "2024-06-01T00:30:00Z"
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["tier"], "raw");
        // Absence of data is an empty series, not an error.
        assert_eq!(body["total_points"], 0);
    }

    /// Test that anomaly detection on an empty range returns the empty
    /// shape with 200.
    #[tokio::test]
    async fn test_anomaly_empty_is_ok() {
        let server = server();
        let response = server
            .get("/anomaly/detect")
            .add_query_param("metric_name", "cpu_usage")
            .add_query_param("start_time", "2024-06-01T00:00:00Z")
            .add_query_param("end_time", "2024-06-02T00:00:00Z")
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_points"], 0);
        assert_eq!(body["anomalies_found"], 0);
    }

    /// Test backfill partial success reporting.
    #[tokio::test]
    async fn test_backfill_partial() {
        let server = server();
        let response = server
            .post("/backfill/import")
            .json(&json!({
                "metrics": [
                    {"metric_name": "m", "value": 1.0, "timestamp": "2024-06-01T12:00:00Z"},
                    {"metric_name": "", "value": 2.0, "timestamp": "2024-06-01T12:01:00Z"}
                ]
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "partial");
        assert_eq!(body["metrics_imported"], 1);
        assert_eq!(body["failed"], 1);
    }

    /// Test metric metadata endpoints.
    #[tokio::test]
    async fn test_metadata_endpoints() {
        let server = server();
        server
            .post("/metrics/ingest")
            .json(&json!({
                "metric_name": "cpu_usage",
                "value": 1.0,
                "timestamp": "2024-06-01T12:00:00Z",
                "labels": {"host": "a"}
            }))
            .await
            .assert_status_ok();

        let response = server.get("/metrics").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total"], 1);
        assert_eq!(body["metrics"][0]["metric_name"], "cpu_usage");

        let response = server.get("/metrics/cpu_usage/info").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["unique_label_combinations"], 1);
        assert_eq!(body["label_keys"][0], "host");

        server.get("/metrics/missing/info").await.assert_status_not_found();
    }
}
