//! Shipment lifecycle: collecting → verifying → finalized

use serde::Serialize;
use uuid::Uuid;
use wlms_common::db::{ScanRecord, Shipment, ShipmentStatus};

use super::Caller;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Shipment header with live content sizes
#[derive(Debug, Serialize)]
pub struct ShipmentView {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub manifest_a_rows: i64,
    pub manifest_b_rows: i64,
    pub scans: i64,
}

/// Load a shipment the caller is allowed to act on
///
/// Unknown shipment → NotFound; shipment of another provider → Forbidden.
pub async fn load_for_caller(
    state: &AppState,
    shipment_id: Uuid,
    caller: &Caller,
) -> ApiResult<Shipment> {
    let shipment = db::shipments::load_shipment(&state.db, shipment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment {}", shipment_id)))?;

    if shipment.provider_id != caller.provider_id {
        tracing::warn!(
            shipment_id = %shipment_id,
            user_id = %caller.user_id,
            "Caller provider does not own shipment"
        );
        return Err(ApiError::Forbidden(format!(
            "Shipment {} belongs to another provider",
            shipment_id
        )));
    }

    Ok(shipment)
}

pub async fn get_shipment(
    state: &AppState,
    shipment_id: Uuid,
    caller: &Caller,
) -> ApiResult<ShipmentView> {
    let shipment = load_for_caller(state, shipment_id, caller).await?;
    let (manifest_a_rows, manifest_b_rows, scans) =
        db::shipments::count_contents(&state.db, shipment_id).await?;

    Ok(ShipmentView {
        shipment,
        manifest_a_rows,
        manifest_b_rows,
        scans,
    })
}

/// Open verification. Already verifying is a no-op.
pub async fn start_verification(
    state: &AppState,
    shipment_id: Uuid,
    caller: &Caller,
) -> ApiResult<Shipment> {
    let shipment = load_for_caller(state, shipment_id, caller).await?;

    match shipment.status {
        ShipmentStatus::Finalized => Err(ApiError::InvalidState(format!(
            "Shipment {} is already finalized",
            shipment_id
        ))),
        ShipmentStatus::Verifying => Ok(shipment),
        ShipmentStatus::Collecting => {
            if db::shipments::promote_to_verifying(&state.db, shipment_id).await? {
                tracing::info!(shipment_id = %shipment_id, user_id = %caller.user_id, "Verification started");
            }
            reload(state, shipment_id).await
        }
    }
}

/// Close verification; the OK set is fixed from here on
pub async fn finalize_shipment(
    state: &AppState,
    shipment_id: Uuid,
    caller: &Caller,
) -> ApiResult<Shipment> {
    load_for_caller(state, shipment_id, caller).await?;

    if !db::shipments::finalize(&state.db, shipment_id, wlms_common::time::now()).await? {
        return Err(ApiError::InvalidState(format!(
            "Shipment {} is already finalized",
            shipment_id
        )));
    }

    tracing::info!(shipment_id = %shipment_id, user_id = %caller.user_id, "Shipment finalized");
    reload(state, shipment_id).await
}

pub async fn list_scans(
    state: &AppState,
    shipment_id: Uuid,
    caller: &Caller,
) -> ApiResult<Vec<ScanRecord>> {
    load_for_caller(state, shipment_id, caller).await?;
    Ok(db::scans::list_scans(&state.db, shipment_id).await?)
}

async fn reload(state: &AppState, shipment_id: Uuid) -> ApiResult<Shipment> {
    db::shipments::load_shipment(&state.db, shipment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment {}", shipment_id)))
}
