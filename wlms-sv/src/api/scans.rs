//! Scan submission endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use wlms_common::db::ScanRecord;

use super::path::ApiPath;
use crate::error::{ApiError, ApiResult};
use crate::services::{self, Caller, ScanOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub tracking_code: Option<String>,
}

/// POST /api/shipments/:id/scans
///
/// 201 when this call recorded the package, 200 with SOBRANTE and the first
/// scan's provenance when someone else already had.
pub async fn submit_scan(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ScanOutcome>)> {
    let Json(request) =
        payload.map_err(|e| ApiError::InvalidInput(format!("Invalid scan request: {}", e)))?;
    let tracking_code = request
        .tracking_code
        .ok_or_else(|| ApiError::InvalidInput("tracking_code is required".to_string()))?;

    let outcome = services::submit_scan(&state, shipment_id, &tracking_code, &caller).await?;
    let status = if outcome.is_duplicate() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(outcome)))
}

/// GET /api/shipments/:id/scans
pub async fn list_scans(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
) -> ApiResult<Json<Vec<ScanRecord>>> {
    Ok(Json(
        services::shipments::list_scans(&state, shipment_id, &caller).await?,
    ))
}
