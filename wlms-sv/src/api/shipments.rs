//! Shipment lifecycle endpoints

use axum::{extract::State, Json};
use uuid::Uuid;
use wlms_common::db::Shipment;

use super::path::ApiPath;
use crate::error::ApiResult;
use crate::services::shipments::{self, ShipmentView};
use crate::services::Caller;
use crate::AppState;

/// GET /api/shipments/:id
pub async fn get_shipment(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
) -> ApiResult<Json<ShipmentView>> {
    Ok(Json(shipments::get_shipment(&state, shipment_id, &caller).await?))
}

/// POST /api/shipments/:id/verification
pub async fn start_verification(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
) -> ApiResult<Json<Shipment>> {
    Ok(Json(shipments::start_verification(&state, shipment_id, &caller).await?))
}

/// POST /api/shipments/:id/finalize
pub async fn finalize_shipment(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
) -> ApiResult<Json<Shipment>> {
    Ok(Json(shipments::finalize_shipment(&state, shipment_id, &caller).await?))
}
