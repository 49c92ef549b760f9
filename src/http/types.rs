//! API types and parameters for HTTP handlers.
//!
//! Timestamps cross this boundary as RFC3339 strings and are normalized
//! to unix seconds (UTC) on the way in.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::PipelineError;
use crate::query::QueryFunction;

/// Request body for `POST /metrics/ingest`.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub metric_name: String,
    pub value: f64,
    /// RFC3339 timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Response body for `POST /metrics/ingest`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_id: Option<u64>,
}

/// One row of a `POST /backfill/import` request.
#[derive(Debug, Deserialize)]
pub struct BackfillSample {
    pub metric_name: String,
    pub value: f64,
    /// RFC3339 timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Request body for `POST /backfill/import`.
#[derive(Debug, Deserialize)]
pub struct BackfillRequest {
    pub metrics: Vec<BackfillSample>,
}

/// Response body for `POST /backfill/import`.
#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    /// "success" when every row imported, "partial" otherwise.
    pub status: String,
    pub message: String,
    pub metrics_imported: usize,
    pub failed: usize,
}

/// Query parameters for `GET /query/raw`.
#[derive(Debug, Deserialize)]
pub struct RawQueryParams {
    pub metric_name: String,
    pub start_time: String,
    pub end_time: String,
    /// Labels as a JSON object string.
    #[serde(default)]
    pub labels: Option<String>,
    #[serde(default)]
    pub fill_gaps: Option<bool>,
    #[serde(default)]
    pub interval_seconds: Option<i64>,
}

/// Query parameters for `GET /query/rollup`.
#[derive(Debug, Deserialize)]
pub struct RollupQueryParams {
    pub metric_name: String,
    pub start_time: String,
    pub end_time: String,
    pub window: String,
    /// Labels as a JSON object string.
    #[serde(default)]
    pub labels: Option<String>,
}

/// Request body for `POST /query` (tier-routed).
#[derive(Debug, Deserialize)]
pub struct RoutedQueryRequest {
    pub metric_name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub function: Option<QueryFunction>,
}

/// A result point; `value` is null for gap-filled steps.
#[derive(Debug, Serialize)]
pub struct PointDto {
    /// RFC3339 timestamp.
    pub timestamp: String,
    pub value: Option<f64>,
}

/// Response body for `GET /query/raw`.
#[derive(Debug, Serialize)]
pub struct RawQueryResponse {
    pub metric_name: String,
    pub points: Vec<PointDto>,
    pub total_points: usize,
}

/// One aggregated bucket of a rollup query.
#[derive(Debug, Serialize)]
pub struct RollupPointDto {
    /// Bucket start, RFC3339.
    pub timestamp: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
    pub count: u64,
}

/// Response body for `GET /query/rollup`.
#[derive(Debug, Serialize)]
pub struct RollupQueryResponse {
    pub metric_name: String,
    pub window: String,
    pub points: Vec<RollupPointDto>,
    pub total_points: usize,
}

/// Response body for `POST /query`.
#[derive(Debug, Serialize)]
pub struct RoutedQueryResponse {
    pub metric_name: String,
    pub function: String,
    /// Tier the query was served from: "raw", "1m", "5m", or "1h".
    pub tier: String,
    pub points: Vec<PointDto>,
    pub total_points: usize,
}

/// Query parameters for `GET /anomaly/detect`.
#[derive(Debug, Deserialize)]
pub struct AnomalyParams {
    pub metric_name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Labels as a JSON object string.
    #[serde(default)]
    pub labels: Option<String>,
}

/// One scored point of an anomaly response.
#[derive(Debug, Serialize)]
pub struct AnomalyPointDto {
    pub timestamp: String,
    pub value: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
}

/// Response body for `GET /anomaly/detect`.
#[derive(Debug, Serialize)]
pub struct AnomalyResponse {
    pub metric_name: String,
    pub total_points: usize,
    pub anomalies_found: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
    pub points: Vec<AnomalyPointDto>,
}

/// Query parameters for `GET /metrics`.
#[derive(Debug, Deserialize)]
pub struct MetricListParams {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub search: Option<String>,
}

/// One entry of the metric listing.
#[derive(Debug, Serialize)]
pub struct MetricListItemDto {
    pub metric_name: String,
    pub sample_count: u64,
    pub first_seen: String,
    pub last_seen: String,
}

/// Response body for `GET /metrics`.
#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub metrics: Vec<MetricListItemDto>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Response body for `GET /metrics/{name}/info`.
#[derive(Debug, Serialize)]
pub struct MetricInfoResponse {
    pub metric_name: String,
    pub sample_count: u64,
    pub first_seen: String,
    pub last_seen: String,
    pub label_keys: Vec<String>,
    pub unique_label_combinations: usize,
    pub min_value: f64,
    pub max_value: f64,
    pub avg_value: f64,
}

/// Query parameters for `GET /rollups`.
#[derive(Debug, Deserialize)]
pub struct RollupListParams {
    #[serde(default)]
    pub metric_name: Option<String>,
}

/// One entry of the rollup inventory.
#[derive(Debug, Serialize)]
pub struct RollupInfoDto {
    pub metric_name: String,
    pub window: String,
    pub total_rollups: u64,
    pub earliest_time: String,
    pub latest_time: String,
}

/// Response body for `GET /rollups`.
#[derive(Debug, Serialize)]
pub struct RollupListResponse {
    pub rollups: Vec<RollupInfoDto>,
    pub total: usize,
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Build an error response with the given status.
pub fn error_response(
    status: StatusCode,
    detail: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { detail: detail.into() }))
}

/// Map a pipeline failure to its HTTP status.
pub fn pipeline_error_response(error: &PipelineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        PipelineError::InvalidWindow(_) | PipelineError::CardinalityExceeded { .. } => {
            StatusCode::BAD_REQUEST
        }
        PipelineError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

/// Parse an RFC3339 timestamp parameter into unix seconds.
///
/// # Parameters
///
/// - `field` - Parameter name, used in the error message
/// - `input` - RFC3339 string
///
/// # Returns
///
/// Returns unix seconds, or a message describing the invalid input.
pub fn parse_timestamp(field: &str, input: &str) -> Result<i64, String> {
    OffsetDateTime::parse(input, &Rfc3339)
        .map(|dt| dt.unix_timestamp())
        .map_err(|e| format!("invalid {field}: {e}"))
}

/// Format unix seconds as an RFC3339 string for responses.
pub fn format_timestamp(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test RFC3339 parameter parsing.
    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("start_time", "2024-06-01T12:00:00Z").expect("valid timestamp");
        assert_eq!(ts, 1_717_243_200);

        let err = parse_timestamp("start_time", "yesterday").unwrap_err();
        assert!(err.contains("start_time"));
    }

    /// Test the parse/format round trip.
    #[test]
    fn test_format_timestamp_round_trip() {
        let formatted = format_timestamp(1_717_243_200);
        assert_eq!(formatted, "2024-06-01T12:00:00Z");
        assert_eq!(parse_timestamp("t", &formatted).expect("valid"), 1_717_243_200);
    }

    /// Test IngestRequest deserialization with optional fields.
    #[test]
    fn test_ingest_request_deserialization() {
        let json = r#"{
            "metric_name": "cpu_usage",
            "value": 75.5,
            "timestamp": "2024-06-01T12:00:00Z",
            "labels": {"host": "server1"},
            "tenant_id": "tenant_123"
        }"#;
        let request: IngestRequest = serde_json::from_str(json).expect("valid JSON");
        assert_eq!(request.metric_name, "cpu_usage");
        assert_eq!(request.tenant_id.as_deref(), Some("tenant_123"));

        let minimal = r#"{"metric_name": "m", "value": 1.0, "timestamp": "2024-06-01T12:00:00Z"}"#;
        let request: IngestRequest = serde_json::from_str(minimal).expect("valid JSON");
        assert!(request.labels.is_none());
    }

    /// Test routed query request defaults.
    #[test]
    fn test_routed_query_request_defaults() {
        let json = r#"{
            "metric_name": "cpu_usage",
            "start_time": "2024-06-01T00:00:00Z",
            "end_time": "2024-06-02T00:00:00Z"
        }"#;
        let request: RoutedQueryRequest = serde_json::from_str(json).expect("valid JSON");
        assert!(request.function.is_none());
        assert!(request.labels.is_none());
    }
}
