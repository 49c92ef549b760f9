//! Anomaly detection handler.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::anomaly::DEFAULT_THRESHOLD;
use crate::http::handlers::query::parse_label_param;
use crate::http::state::AppState;
use crate::http::types::{
    error_response, format_timestamp, parse_timestamp, pipeline_error_response, AnomalyParams,
    AnomalyPointDto, AnomalyResponse,
};

/// Detect statistically anomalous points in a raw range.
///
/// A range with fewer than two matching points returns the zero-statistics
/// shape with 200; absence of data is not a fault.
///
/// # Parameters
///
/// - `state` - Application state with the detector
/// - `params` - Metric, range, threshold, and label filter
///
/// # Returns
///
/// Returns the scored report.
pub async fn detect_anomalies(
    State(state): State<AppState>,
    Query(params): Query<AnomalyParams>,
) -> impl IntoResponse {
    let start = match parse_timestamp("start_time", &params.start_time) {
        Ok(ts) => ts,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };
    let end = match parse_timestamp("end_time", &params.end_time) {
        Ok(ts) => ts,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };
    let labels = match parse_label_param(params.labels.as_deref()) {
        Ok(labels) => labels,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };
    let threshold = params.threshold.unwrap_or(DEFAULT_THRESHOLD);

    match state.detector.detect(&params.metric_name, start, end, threshold, &labels) {
        Ok(report) => {
            let points: Vec<AnomalyPointDto> = report
                .points
                .iter()
                .map(|p| AnomalyPointDto {
                    timestamp: format_timestamp(p.timestamp),
                    value: p.value,
                    z_score: p.z_score,
                    is_anomaly: p.is_anomaly,
                })
                .collect();
            let response = AnomalyResponse {
                metric_name: report.metric_name,
                total_points: report.total_points,
                anomalies_found: report.anomalies_found,
                mean: report.mean,
                std_dev: report.std_dev,
                threshold: report.threshold,
                points,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}
