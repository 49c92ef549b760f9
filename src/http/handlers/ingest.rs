//! Ingestion handlers: single-sample ingest and bulk backfill import.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::debug;

use crate::http::state::AppState;
use crate::http::types::{
    error_response, parse_timestamp, pipeline_error_response, BackfillRequest, BackfillResponse,
    BackfillSample, IngestRequest, IngestResponse,
};
use crate::labels::Labels;
use crate::store::RawSample;

/// Ingest one metric sample.
///
/// The sample passes the cardinality guard before it is stored; a rejected
/// label combination surfaces as 400 with the limit in the message, never
/// as a silent drop.
///
/// # Parameters
///
/// - `state` - Application state with store and cardinality guard
/// - `request` - Sample to ingest
///
/// # Returns
///
/// Returns the assigned row id on success, or an error status.
pub async fn ingest_metric(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> impl IntoResponse {
    let metric_name = request.metric_name.trim();
    if metric_name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "metric_name must be a non-empty string")
            .into_response();
    }
    if !request.value.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "value must be a finite number")
            .into_response();
    }
    let timestamp = match parse_timestamp("timestamp", &request.timestamp) {
        Ok(timestamp) => timestamp,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message).into_response(),
    };

    let labels = Labels::normalize(request.labels.unwrap_or_default());
    if let Err(err) = state.guard.admit(metric_name, &labels) {
        return pipeline_error_response(&err).into_response();
    }

    let mut sample = RawSample::new(metric_name, request.value, timestamp, labels);
    if let Some(tenant_id) = request.tenant_id {
        sample = sample.with_tenant(tenant_id);
    }

    match state.store.insert_raw(sample) {
        Ok(id) => {
            debug!("ingested sample {id} for metric {metric_name}");
            (
                StatusCode::OK,
                Json(IngestResponse {
                    status: "success".to_string(),
                    message: "Metric ingested successfully".to_string(),
                    metric_id: Some(id),
                }),
            )
                .into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}

/// Import a batch of historical samples.
///
/// Malformed rows are counted as failed without failing the batch; the
/// response reports both counts.
///
/// # Parameters
///
/// - `state` - Application state with store
/// - `request` - Batch of samples to import
///
/// # Returns
///
/// Returns imported/failed counts; "partial" status when some rows were
/// dropped.
pub async fn import_historical(
    State(state): State<AppState>,
    Json(request): Json<BackfillRequest>,
) -> impl IntoResponse {
    let mut samples = Vec::with_capacity(request.metrics.len());
    let mut failed = 0;
    for row in request.metrics {
        match validate_row(row) {
            Some(sample) => samples.push(sample),
            None => failed += 1,
        }
    }

    match state.store.insert_raw_bulk(samples) {
        Ok(imported) => {
            let mut message = format!("Imported {imported} metrics");
            if failed > 0 {
                message.push_str(&format!(", {failed} failed"));
            }
            let status = if failed == 0 { "success" } else { "partial" };
            (
                StatusCode::OK,
                Json(BackfillResponse {
                    status: status.to_string(),
                    message,
                    metrics_imported: imported,
                    failed,
                }),
            )
                .into_response()
        }
        Err(err) => pipeline_error_response(&err).into_response(),
    }
}

/// Validate one backfill row, returning the sample to store or `None`
/// when the row is malformed.
fn validate_row(row: BackfillSample) -> Option<RawSample> {
    let metric_name = row.metric_name.trim();
    if metric_name.is_empty() || !row.value.is_finite() {
        return None;
    }
    let timestamp = parse_timestamp("timestamp", &row.timestamp).ok()?;
    let labels = Labels::normalize(row.labels.unwrap_or_default());
    let mut sample = RawSample::new(metric_name, row.value, timestamp, labels);
    if let Some(tenant_id) = row.tenant_id {
        sample = sample.with_tenant(tenant_id);
    }
    Some(sample)
}
