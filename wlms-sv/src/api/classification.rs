//! Classification upload endpoints

use axum::{
    body::Bytes,
    extract::State,
    Json,
};
use uuid::Uuid;

use super::path::ApiPath;
use crate::error::ApiResult;
use crate::services::classification::{self, ClassificationBatchView, ClassificationSummary};
use crate::services::Caller;
use crate::AppState;

/// POST /api/shipments/:id/classification
///
/// Body is the raw spreadsheet (xlsx/xls/ods) or CSV file.
pub async fn upload_classification(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
    body: Bytes,
) -> ApiResult<Json<ClassificationSummary>> {
    Ok(Json(
        classification::upload_classification(&state, shipment_id, &body, &caller).await?,
    ))
}

/// GET /api/shipments/:id/classification
pub async fn latest_classification(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
    caller: Caller,
) -> ApiResult<Json<ClassificationBatchView>> {
    Ok(Json(
        classification::latest_classification(&state, shipment_id, &caller).await?,
    ))
}

/// GET /api/shipments/:id/classification/:batch_id
pub async fn get_classification_batch(
    State(state): State<AppState>,
    ApiPath((shipment_id, batch_id)): ApiPath<(Uuid, Uuid)>,
    caller: Caller,
) -> ApiResult<Json<ClassificationBatchView>> {
    Ok(Json(
        classification::get_classification_batch(&state, shipment_id, batch_id, &caller).await?,
    ))
}
