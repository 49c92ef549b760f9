//! Metadata handlers: metric listing, per-metric info, and the rollup
//! inventory.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::http::state::AppState;
use crate::http::types::{
    error_response, format_timestamp, pipeline_error_response, MetricInfoResponse,
    MetricListItemDto, MetricListParams, MetricListResponse, RollupInfoDto, RollupListParams,
    RollupListResponse,
};

/// Default page size for the metric listing.
const DEFAULT_PAGE_SIZE: usize = 10;

/// List stored metrics with pagination and optional substring search.
///
/// # Parameters
///
/// - `state` - Application state with store
/// - `params` - Page, page size, and search filter
///
/// # Returns
///
/// Returns one page of metric summaries plus the total match count.
pub async fn list_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricListParams>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    match state.store.list_metrics(params.search.as_deref()) {
        Ok(summaries) => {
            let total = summaries.len();
            let metrics: Vec<MetricListItemDto> = summaries
                .into_iter()
                .skip((page - 1) * page_size)
                .take(page_size)
                .map(|m| MetricListItemDto {
                    metric_name: m.metric_name,
                    sample_count: m.sample_count,
                    first_seen: format_timestamp(m.first_seen),
                    last_seen: format_timestamp(m.last_seen),
                })
                .collect();
            (StatusCode::OK, Json(MetricListResponse { metrics, total, page, page_size }))
                .into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}

/// Detailed metadata for one metric.
///
/// # Parameters
///
/// - `state` - Application state with store
/// - `name` - Metric name from the path
///
/// # Returns
///
/// Returns aggregates, label keys, and the distinct-combination count, or
/// 404 when the metric has no samples.
pub async fn metric_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.store.metric_detail(&name) {
        Ok(Some(detail)) => (
            StatusCode::OK,
            Json(MetricInfoResponse {
                metric_name: detail.metric_name,
                sample_count: detail.sample_count,
                first_seen: format_timestamp(detail.first_seen),
                last_seen: format_timestamp(detail.last_seen),
                label_keys: detail.label_keys,
                unique_label_combinations: detail.unique_label_combinations,
                min_value: detail.min_value,
                max_value: detail.max_value,
                avg_value: detail.avg_value,
            }),
        )
            .into_response(),
        Ok(None) => {
            error_response(StatusCode::NOT_FOUND, format!("Metric '{name}' not found"))
                .into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}

/// List the rollup inventory, optionally filtered by metric.
///
/// # Parameters
///
/// - `state` - Application state with store
/// - `params` - Optional metric filter
///
/// # Returns
///
/// Returns per (metric, window) record counts and covered time spans.
pub async fn list_rollups(
    State(state): State<AppState>,
    Query(params): Query<RollupListParams>,
) -> impl IntoResponse {
    match state.store.rollup_summaries(params.metric_name.as_deref()) {
        Ok(summaries) => {
            let rollups: Vec<RollupInfoDto> = summaries
                .into_iter()
                .map(|s| RollupInfoDto {
                    metric_name: s.metric_name,
                    window: s.window.as_str().to_string(),
                    total_rollups: s.total_rollups,
                    earliest_time: format_timestamp(s.earliest_time),
                    latest_time: format_timestamp(s.latest_time),
                })
                .collect();
            let total = rollups.len();
            (StatusCode::OK, Json(RollupListResponse { rollups, total })).into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}
