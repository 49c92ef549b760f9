//! Query handlers: direct raw/rollup range queries and the tier-routed
//! query.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::gapfill;
use crate::http::state::AppState;
use crate::http::types::{
    error_response, format_timestamp, parse_timestamp, pipeline_error_response, PointDto,
    RawQueryParams, RawQueryResponse, RollupPointDto, RollupQueryParams, RollupQueryResponse,
    RoutedQueryRequest, RoutedQueryResponse,
};
use crate::labels::Labels;
use crate::query::QueryFunction;
use crate::timebucket::Window;

/// Default gap-fill grid step in seconds.
const DEFAULT_FILL_INTERVAL_SECS: i64 = 60;

/// Parse the optional `labels` query parameter (a JSON object string).
pub(crate) fn parse_label_param(param: Option<&str>) -> Result<Labels, String> {
    match param {
        None => Ok(Labels::empty()),
        Some(s) if s.trim().is_empty() => Ok(Labels::empty()),
        Some(s) => serde_json::from_str::<HashMap<String, String>>(s)
            .map(Labels::normalize)
            .map_err(|_| "Invalid labels format. Must be valid JSON string.".to_string()),
    }
}

/// Query raw samples in a time range, optionally gap-filled for charting.
///
/// # Parameters
///
/// - `state` - Application state with the query router
/// - `params` - Metric, range, label filter, and gap-fill options
///
/// # Returns
///
/// Returns the matching points; an empty list when nothing matches.
pub async fn query_raw(
    State(state): State<AppState>,
    Query(params): Query<RawQueryParams>,
) -> impl IntoResponse {
    let (start, end) = match parse_range(&params.start_time, &params.end_time) {
        Ok(range) => range,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };
    let labels = match parse_label_param(params.labels.as_deref()) {
        Ok(labels) => labels,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };

    let points = match state.router.query_raw(&params.metric_name, start, end, &labels) {
        Ok(points) => points,
        Err(err) => return pipeline_error_response(&err).into_response(),
    };

    let dto_points: Vec<PointDto> = if params.fill_gaps.unwrap_or(false) {
        let interval = params.interval_seconds.unwrap_or(DEFAULT_FILL_INTERVAL_SECS);
        if interval <= 0 {
            return error_response(StatusCode::BAD_REQUEST, "interval_seconds must be positive")
                .into_response();
        }
        gapfill::fill(&points, start, end, interval)
            .iter()
            .map(|p| PointDto { timestamp: format_timestamp(p.timestamp), value: p.value })
            .collect()
    } else {
        points
            .iter()
            .map(|p| PointDto { timestamp: format_timestamp(p.timestamp), value: Some(p.value) })
            .collect()
    };

    let response = RawQueryResponse {
        metric_name: params.metric_name,
        total_points: dto_points.len(),
        points: dto_points,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Query pre-computed rollups at an explicit window.
///
/// # Parameters
///
/// - `state` - Application state with the query router
/// - `params` - Metric, range, window name, and label filter
///
/// # Returns
///
/// Returns one aggregate tuple per bucket; 400 for unknown window names.
pub async fn query_rollup(
    State(state): State<AppState>,
    Query(params): Query<RollupQueryParams>,
) -> impl IntoResponse {
    let window: Window = match params.window.parse() {
        Ok(window) => window,
        Err(err) => return pipeline_error_response(&err).into_response(),
    };
    let (start, end) = match parse_range(&params.start_time, &params.end_time) {
        Ok(range) => range,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };
    let labels = match parse_label_param(params.labels.as_deref()) {
        Ok(labels) => labels,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };

    match state.router.query_rollups(&params.metric_name, window, start, end, &labels) {
        Ok(records) => {
            let points: Vec<RollupPointDto> = records
                .iter()
                .map(|r| RollupPointDto {
                    timestamp: format_timestamp(r.start_time),
                    min: r.min,
                    max: r.max,
                    avg: r.avg,
                    sum: r.sum,
                    count: r.count,
                })
                .collect();
            let response = RollupQueryResponse {
                metric_name: params.metric_name,
                window: window.as_str().to_string(),
                total_points: points.len(),
                points,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}

/// Tier-routed range query.
///
/// Picks the coarsest adequate resolution for the requested range, applies
/// the aggregation function, and reports which tier served the query.
///
/// # Parameters
///
/// - `state` - Application state with the query router
/// - `request` - Metric, range, label filter, and function
///
/// # Returns
///
/// Returns the transformed points and the serving tier.
pub async fn query_routed(
    State(state): State<AppState>,
    Json(request): Json<RoutedQueryRequest>,
) -> impl IntoResponse {
    let (start, end) = match parse_range(&request.start_time, &request.end_time) {
        Ok(range) => range,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };
    let labels = Labels::normalize(request.labels.unwrap_or_default());
    let function = request.function.unwrap_or(QueryFunction::Avg);

    match state.router.query(&request.metric_name, start, end, &labels, function) {
        Ok(outcome) => {
            let points: Vec<PointDto> = outcome
                .points
                .iter()
                .map(|p| PointDto { timestamp: format_timestamp(p.timestamp), value: Some(p.value) })
                .collect();
            let response = RoutedQueryResponse {
                metric_name: request.metric_name,
                function: function.as_str().to_string(),
                tier: outcome.tier.as_str().to_string(),
                total_points: points.len(),
                points,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}

/// Parse the start/end parameter pair.
fn parse_range(start: &str, end: &str) -> Result<(i64, i64), String> {
    let start = parse_timestamp("start_time", start)?;
    let end = parse_timestamp("end_time", end)?;
    if end < start {
        return Err("end_time must not be before start_time".to_string());
    }
    Ok((start, end))
}
