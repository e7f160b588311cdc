//! Classification enrichment
//!
//! After a shipment is finalized, a vehicle-assignment file tags each
//! confirmed-OK package with a vehicle id and a per-vehicle visit order.
//!
//! The visit order is the row's position among that vehicle's surviving rows
//! in file order (1, 2, ... n). The label column is kept for display only and
//! never influences the number.
//!
//! Uploads are last-writer-wins: each one replaces the shipment's previous
//! batch inside a single transaction.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;
use wlms_common::db::{ClassificationBatch, ClassificationRow, ShipmentStatus};

use super::classification_file::{read_classification_file, RawClassificationRow};
use super::shipments::load_for_caller;
use super::Caller;
use crate::db;
use crate::db::classification::NewClassificationRow;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Result of one classification upload
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationSummary {
    pub batch_id: Uuid,
    /// Data rows read from the file (header and blank rows excluded)
    pub total_rows: usize,
    /// Rows accepted and persisted
    pub processed: usize,
    pub vehicles: usize,
    pub rows_per_vehicle: BTreeMap<String, usize>,
    /// Rows missing tracking code or vehicle id
    pub skipped_invalid: usize,
    /// Rows whose code is not an OK scan of the shipment
    pub skipped_not_ok: usize,
}

/// Stored batch with its rows
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationBatchView {
    #[serde(flatten)]
    pub batch: ClassificationBatch,
    pub rows: Vec<ClassificationRow>,
}

/// Rows that survived filtering, with visit orders assigned
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VisitPlan {
    pub rows: Vec<NewClassificationRow>,
    pub skipped_invalid: usize,
    pub skipped_not_ok: usize,
}

/// Filter rows and number each vehicle's stops in file order
///
/// The counters start fresh for every file.
pub fn plan_visits(raw_rows: Vec<RawClassificationRow>, ok_codes: &HashSet<String>) -> VisitPlan {
    let mut plan = VisitPlan::default();
    let mut next_order: HashMap<String, i64> = HashMap::new();

    for raw in raw_rows {
        let row = match raw.validate() {
            Ok(row) => row,
            Err(_) => {
                plan.skipped_invalid += 1;
                continue;
            }
        };

        if !ok_codes.contains(&row.tracking_code) {
            plan.skipped_not_ok += 1;
            continue;
        }

        let counter = next_order.entry(row.vehicle_id.clone()).or_insert(0);
        *counter += 1;

        plan.rows.push(NewClassificationRow {
            tracking_code: row.tracking_code,
            vehicle_id: row.vehicle_id,
            visit_label: row.visit_label,
            visit_order: *counter,
        });
    }

    plan
}

pub async fn upload_classification(
    state: &AppState,
    shipment_id: Uuid,
    file_bytes: &[u8],
    caller: &Caller,
) -> ApiResult<ClassificationSummary> {
    let shipment = load_for_caller(state, shipment_id, caller).await?;
    if shipment.status != ShipmentStatus::Finalized {
        return Err(ApiError::InvalidState(format!(
            "Shipment {} must be finalized before classification (status: {})",
            shipment_id,
            shipment.status.as_str()
        )));
    }

    let raw_rows = read_classification_file(file_bytes)?;
    let total_rows = raw_rows.len();

    let ok_codes = db::scans::ok_tracking_codes(&state.db, shipment_id).await?;
    let plan = plan_visits(raw_rows, &ok_codes);

    if plan.rows.is_empty() {
        return Err(ApiError::EmptyResult(format!(
            "No usable rows: {} invalid, {} not verified OK",
            plan.skipped_invalid, plan.skipped_not_ok
        )));
    }

    let mut rows_per_vehicle: BTreeMap<String, usize> = BTreeMap::new();
    for row in &plan.rows {
        *rows_per_vehicle.entry(row.vehicle_id.clone()).or_insert(0) += 1;
    }

    let batch = ClassificationBatch {
        id: Uuid::new_v4(),
        shipment_id,
        uploaded_by: caller.user_id.clone(),
        row_count: plan.rows.len() as i64,
        created_at: wlms_common::time::now(),
    };
    let superseded = db::classification::replace_batch(&state.db, &batch, &plan.rows).await?;

    tracing::info!(
        shipment_id = %shipment_id,
        batch_id = %batch.id,
        processed = plan.rows.len(),
        vehicles = rows_per_vehicle.len(),
        skipped_invalid = plan.skipped_invalid,
        skipped_not_ok = plan.skipped_not_ok,
        superseded,
        "Classification batch stored"
    );

    Ok(ClassificationSummary {
        batch_id: batch.id,
        total_rows,
        processed: plan.rows.len(),
        vehicles: rows_per_vehicle.len(),
        rows_per_vehicle,
        skipped_invalid: plan.skipped_invalid,
        skipped_not_ok: plan.skipped_not_ok,
    })
}

pub async fn get_classification_batch(
    state: &AppState,
    shipment_id: Uuid,
    batch_id: Uuid,
    caller: &Caller,
) -> ApiResult<ClassificationBatchView> {
    load_for_caller(state, shipment_id, caller).await?;

    let batch = db::classification::load_batch(&state.db, shipment_id, batch_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Classification batch {}", batch_id)))?;

    batch_view(state, batch).await
}

pub async fn latest_classification(
    state: &AppState,
    shipment_id: Uuid,
    caller: &Caller,
) -> ApiResult<ClassificationBatchView> {
    load_for_caller(state, shipment_id, caller).await?;

    let batch = db::classification::latest_batch(&state.db, shipment_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No classification batch for shipment {}", shipment_id))
        })?;

    batch_view(state, batch).await
}

async fn batch_view(state: &AppState, batch: ClassificationBatch) -> ApiResult<ClassificationBatchView> {
    let rows = db::classification::load_batch_rows(&state.db, batch.id).await?;
    Ok(ClassificationBatchView { batch, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(code: Option<&str>, vehicle: Option<&str>, label: Option<&str>) -> RawClassificationRow {
        RawClassificationRow {
            line: 0,
            tracking_code: code.map(str::to_string),
            vehicle_id: vehicle.map(str::to_string),
            visit_label: label.map(str::to_string),
        }
    }

    fn ok_set(codes: &[&str]) -> HashSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_orders_are_gap_free_per_vehicle_in_file_order() {
        let rows = vec![
            raw(Some("A"), Some("V1"), Some("INICIO")),
            raw(Some("B"), Some("V2"), Some("INICIO")),
            raw(Some("C"), Some("V1"), Some("7")),
            raw(Some("D"), Some("V1"), Some("3")),
            raw(Some("E"), Some("V2"), None),
        ];
        let plan = plan_visits(rows, &ok_set(&["A", "B", "C", "D", "E"]));

        let orders = |vehicle: &str| -> Vec<(String, i64)> {
            plan.rows
                .iter()
                .filter(|r| r.vehicle_id == vehicle)
                .map(|r| (r.tracking_code.clone(), r.visit_order))
                .collect()
        };
        assert_eq!(
            orders("V1"),
            vec![("A".to_string(), 1), ("C".to_string(), 2), ("D".to_string(), 3)]
        );
        assert_eq!(orders("V2"), vec![("B".to_string(), 1), ("E".to_string(), 2)]);
    }

    #[test]
    fn test_label_is_kept_but_does_not_drive_order() {
        let rows = vec![
            raw(Some("A"), Some("V1"), Some("5")),
            raw(Some("B"), Some("V1"), Some("INICIO")),
        ];
        let plan = plan_visits(rows, &ok_set(&["A", "B"]));

        assert_eq!(plan.rows[0].visit_order, 1);
        assert_eq!(plan.rows[0].visit_label.as_deref(), Some("5"));
        assert_eq!(plan.rows[1].visit_order, 2);
        assert_eq!(plan.rows[1].visit_label.as_deref(), Some("INICIO"));
    }

    #[test]
    fn test_skipped_rows_do_not_consume_orders() {
        let rows = vec![
            raw(Some("A"), Some("V1"), None),
            raw(Some("NOT-OK"), Some("V1"), None),
            raw(Some("B"), None, None),
            raw(Some("C"), Some("V1"), None),
        ];
        let plan = plan_visits(rows, &ok_set(&["A", "B", "C"]));

        assert_eq!(plan.skipped_not_ok, 1);
        assert_eq!(plan.skipped_invalid, 1);
        let orders: Vec<i64> = plan.rows.iter().map(|r| r.visit_order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn test_codes_are_matched_after_normalization() {
        let rows = vec![raw(Some(" abc1 "), Some("V1"), None)];
        let plan = plan_visits(rows, &ok_set(&["ABC1"]));

        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].tracking_code, "ABC1");
    }
}
