//! Scan ingestion
//!
//! Classifies one physical scan against both manifests and records it at most
//! once per (shipment, tracking code). Many devices scan the same shipment
//! concurrently with no coordination between them; the UNIQUE index on
//! `scan_records` decides which scan came first. Every losing caller gets a
//! SOBRANTE answer carrying the first scan's provenance instead of an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use wlms_common::db::{retry_on_lock, ManifestARow, ManifestBRow, ScanRecord, ScanStatus, ShipmentStatus};
use wlms_common::normalize_tracking_code;

use super::shipments::load_for_caller;
use super::Caller;
use crate::db;
use crate::db::scans::NewScan;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Manifest A details shown to the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryDetails {
    pub buyer_name: Option<String>,
    pub buyer_city: Option<String>,
    pub weight: Option<f64>,
}

impl From<&ManifestARow> for DeliveryDetails {
    fn from(row: &ManifestARow) -> Self {
        Self {
            buyer_name: row.buyer_name.clone(),
            buyer_city: row.buyer_city.clone(),
            weight: row.weight,
        }
    }
}

/// Manifest B details shown to the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDetails {
    pub route_code: Option<String>,
    pub carrier_name: Option<String>,
    pub delivery_address: Option<String>,
    pub driver_name: Option<String>,
}

impl From<&ManifestBRow> for RouteDetails {
    fn from(row: &ManifestBRow) -> Self {
        Self {
            route_code: row.route_code.clone(),
            carrier_name: row.carrier_name.clone(),
            delivery_address: row.delivery_address.clone(),
            driver_name: row.driver_name.clone(),
        }
    }
}

/// Who recorded the package first
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateProvenance {
    pub already_scanned_by: String,
    pub already_scanned_by_name: String,
    pub already_scanned_at: DateTime<Utc>,
    pub original_status: ScanStatus,
}

/// Answer returned to the scanning device
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub status: ScanStatus,
    pub manifest_a: Option<DeliveryDetails>,
    pub manifest_b: Option<RouteDetails>,
    pub scan_record: ScanRecord,
    pub scanned_by_name: String,
    /// Present only when another scan of this code was recorded first
    pub duplicate: Option<DuplicateProvenance>,
}

impl ScanOutcome {
    pub fn is_duplicate(&self) -> bool {
        self.duplicate.is_some()
    }
}

/// Classify and record one scan
pub async fn submit_scan(
    state: &AppState,
    shipment_id: Uuid,
    raw_tracking_code: &str,
    caller: &Caller,
) -> ApiResult<ScanOutcome> {
    let tracking_code = normalize_tracking_code(raw_tracking_code);
    if tracking_code.is_empty() {
        return Err(ApiError::InvalidInput("tracking_code is required".to_string()));
    }

    let shipment = load_for_caller(state, shipment_id, caller).await?;
    if shipment.status == ShipmentStatus::Finalized {
        return Err(ApiError::InvalidState(format!(
            "Shipment {} is finalized; scanning is closed",
            shipment_id
        )));
    }

    let manifest_a = db::manifests::find_manifest_a_row(&state.db, shipment_id, &tracking_code).await?;
    let manifest_b = db::manifests::find_manifest_b_row(&state.db, shipment_id, &tracking_code).await?;
    let classified = if manifest_a.is_none() && manifest_b.is_none() {
        db::classification::is_classified(&state.db, shipment_id, &tracking_code).await?
    } else {
        false
    };

    if manifest_a.is_none() && manifest_b.is_none() && !classified {
        tracing::info!(shipment_id = %shipment_id, tracking_code = %tracking_code, "Scan rejected: out of scope");
        return Err(ApiError::OutOfScope(format!(
            "Package {} does not belong to this operation",
            tracking_code
        )));
    }

    let status = ScanStatus::classify(manifest_a.is_some(), manifest_b.is_some());
    let new_scan = NewScan {
        shipment_id,
        tracking_code: tracking_code.clone(),
        scanned_by: caller.user_id.clone(),
        status,
        scanned_at: wlms_common::time::now(),
        manifest_a_row_id: manifest_a.as_ref().map(|r| r.id),
        manifest_b_row_id: manifest_b.as_ref().map(|r| r.id),
    };

    let pool = &state.db;
    let scan = &new_scan;
    let inserted = retry_on_lock("insert_scan", state.max_lock_wait_ms, move || {
        db::scans::insert_scan(pool, scan)
    })
    .await;

    let scan_record = match inserted {
        Ok(record) => record,
        Err(err) if err.is_unique_violation() => {
            return duplicate_outcome(state, shipment_id, &tracking_code, caller).await;
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(
        shipment_id = %shipment_id,
        tracking_code = %tracking_code,
        status = status.as_str(),
        user_id = %caller.user_id,
        "Scan recorded"
    );

    apply_winning_side_effects(state, &scan_record, manifest_a.as_ref(), manifest_b.as_ref()).await;

    Ok(ScanOutcome {
        status,
        manifest_a: manifest_a.as_ref().map(DeliveryDetails::from),
        manifest_b: manifest_b.as_ref().map(RouteDetails::from),
        scanned_by_name: user_display_name(state, &caller.user_id).await?,
        scan_record,
        duplicate: None,
    })
}

/// Best-effort writes after the first scan of a code
///
/// Each update stands alone: a failure is logged and the scan still counts.
/// Reports derive from `scan_records`, so a stale manifest flag is harmless.
async fn apply_winning_side_effects(
    state: &AppState,
    scan: &ScanRecord,
    manifest_a: Option<&ManifestARow>,
    manifest_b: Option<&ManifestBRow>,
) {
    if let Some(row) = manifest_a {
        if let Err(e) =
            db::manifests::mark_manifest_a_verified(&state.db, row.id, scan.status, scan.id).await
        {
            tracing::warn!(tracking_code = %scan.tracking_code, error = %e, "Manifest A verification update failed");
        }
    }

    if let Some(row) = manifest_b {
        if let Err(e) =
            db::manifests::mark_manifest_b_verified(&state.db, row.id, scan.status, scan.id).await
        {
            tracing::warn!(tracking_code = %scan.tracking_code, error = %e, "Manifest B verification update failed");
        }
    }

    match db::shipments::promote_to_verifying(&state.db, scan.shipment_id).await {
        Ok(true) => tracing::info!(shipment_id = %scan.shipment_id, "First scan moved shipment to verifying"),
        Ok(false) => {}
        Err(e) => tracing::warn!(shipment_id = %scan.shipment_id, error = %e, "Shipment status update failed"),
    }
}

/// Build the SOBRANTE answer for a code someone else recorded first
async fn duplicate_outcome(
    state: &AppState,
    shipment_id: Uuid,
    tracking_code: &str,
    caller: &Caller,
) -> ApiResult<ScanOutcome> {
    let existing = db::scans::find_scan(&state.db, shipment_id, tracking_code)
        .await?
        .ok_or_else(|| {
            ApiError::Internal(format!(
                "Scan of {} conflicted but no existing record was found",
                tracking_code
            ))
        })?;

    let pool = &state.db;
    let counted = retry_on_lock("record_duplicate_scan", state.max_lock_wait_ms, move || {
        db::shipments::record_duplicate_scan(pool, shipment_id)
    })
    .await;
    if let Err(e) = counted {
        tracing::warn!(shipment_id = %shipment_id, error = %e, "Duplicate scan counter update failed");
    }

    tracing::warn!(
        shipment_id = %shipment_id,
        tracking_code = %tracking_code,
        user_id = %caller.user_id,
        first_scanned_by = %existing.scanned_by,
        "Duplicate scan"
    );

    let manifest_a = match existing.manifest_a_row_id {
        Some(id) => db::manifests::load_manifest_a_row(&state.db, id).await?,
        None => None,
    };
    let manifest_b = match existing.manifest_b_row_id {
        Some(id) => db::manifests::load_manifest_b_row(&state.db, id).await?,
        None => None,
    };

    let duplicate = DuplicateProvenance {
        already_scanned_by_name: user_display_name(state, &existing.scanned_by).await?,
        already_scanned_by: existing.scanned_by.clone(),
        already_scanned_at: existing.scanned_at,
        original_status: existing.status,
    };

    Ok(ScanOutcome {
        status: ScanStatus::Sobrante,
        manifest_a: manifest_a.as_ref().map(DeliveryDetails::from),
        manifest_b: manifest_b.as_ref().map(RouteDetails::from),
        scanned_by_name: user_display_name(state, &caller.user_id).await?,
        scan_record: existing,
        duplicate: Some(duplicate),
    })
}

/// Display name, falling back to the raw id for users the session layer never registered
async fn user_display_name(state: &AppState, user_id: &str) -> ApiResult<String> {
    Ok(db::users::display_name(&state.db, user_id)
        .await?
        .unwrap_or_else(|| user_id.to_string()))
}
