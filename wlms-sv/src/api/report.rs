//! Reconciliation report endpoint

use axum::{extract::State, Json};
use uuid::Uuid;

use super::path::ApiPath;
use crate::error::ApiResult;
use crate::services::{self, Caller, ReconciliationReport};
use crate::AppState;

/// GET /api/shipments/:id/report
pub async fn get_report(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
) -> ApiResult<Json<ReconciliationReport>> {
    Ok(Json(services::build_report(&state, shipment_id, &caller).await?))
}
