//! Reconciliation report
//!
//! Always recomputed from current rows; verification is live, so there is
//! nothing to cache. Counts come from the presence of scan records and their
//! stored status. The manifests' cached `verified` flag is never read here,
//! because a crash between a scan insert and the manifest update may leave it
//! stale.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use wlms_common::db::{ManifestARow, ManifestBRow, ScanRecord, ScanStatus, ShipmentStatus};

use super::shipments::load_for_caller;
use super::Caller;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub manifest_a: usize,
    pub manifest_b: usize,
    pub scanned: usize,
    pub ok: usize,
    pub faltantes: usize,
    pub sobrante: usize,
    pub fuera_cobertura: usize,
    pub previo: usize,
    /// Scans answered with "already scanned"
    pub duplicate_scans: i64,
}

/// Manifest A package (missing or out-of-coverage)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryItem {
    pub tracking_code: String,
    pub buyer_name: Option<String>,
    pub buyer_city: Option<String>,
    pub weight: Option<f64>,
    pub scanned: bool,
}

/// Manifest B package present only in the route plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteItem {
    pub tracking_code: String,
    pub route_code: Option<String>,
    pub carrier_name: Option<String>,
    pub delivery_address: Option<String>,
    pub driver_name: Option<String>,
    pub scanned: bool,
}

/// Scan that matched neither manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurplusItem {
    pub tracking_code: String,
    pub scanned_by: String,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub shipment_id: Uuid,
    pub shipment_status: ShipmentStatus,
    pub generated_at: DateTime<Utc>,
    pub counts: ReportCounts,
    pub faltantes: Vec<DeliveryItem>,
    pub fuera_cobertura: Vec<DeliveryItem>,
    pub previo: Vec<RouteItem>,
    pub sobrante: Vec<SurplusItem>,
}

pub async fn build_report(
    state: &AppState,
    shipment_id: Uuid,
    caller: &Caller,
) -> ApiResult<ReconciliationReport> {
    let shipment = load_for_caller(state, shipment_id, caller).await?;

    let manifest_a = db::manifests::list_manifest_a(&state.db, shipment_id).await?;
    let manifest_b = db::manifests::list_manifest_b(&state.db, shipment_id).await?;
    let scans = db::scans::list_scans(&state.db, shipment_id).await?;

    let mut report = reconcile(&manifest_a, &manifest_b, &scans);
    report.counts.duplicate_scans = shipment.duplicate_scans;

    Ok(ReconciliationReport {
        shipment_id,
        shipment_status: shipment.status,
        generated_at: wlms_common::time::now(),
        counts: report.counts,
        faltantes: report.faltantes,
        fuera_cobertura: report.fuera_cobertura,
        previo: report.previo,
        sobrante: report.sobrante,
    })
}

/// Counts and detail lists, independent of shipment metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub counts: ReportCounts,
    pub faltantes: Vec<DeliveryItem>,
    pub fuera_cobertura: Vec<DeliveryItem>,
    pub previo: Vec<RouteItem>,
    pub sobrante: Vec<SurplusItem>,
}

/// Partition A∪B by scan presence and manifest membership
///
/// Detail lists are sorted by tracking code.
pub fn reconcile(
    manifest_a: &[ManifestARow],
    manifest_b: &[ManifestBRow],
    scans: &[ScanRecord],
) -> Reconciliation {
    let a: BTreeMap<&str, &ManifestARow> =
        manifest_a.iter().map(|r| (r.tracking_code.as_str(), r)).collect();
    let b: BTreeMap<&str, &ManifestBRow> =
        manifest_b.iter().map(|r| (r.tracking_code.as_str(), r)).collect();
    let scanned: HashMap<&str, &ScanRecord> =
        scans.iter().map(|s| (s.tracking_code.as_str(), s)).collect();

    let delivery_item = |row: &ManifestARow| DeliveryItem {
        tracking_code: row.tracking_code.clone(),
        buyer_name: row.buyer_name.clone(),
        buyer_city: row.buyer_city.clone(),
        weight: row.weight,
        scanned: scanned.contains_key(row.tracking_code.as_str()),
    };

    let faltantes: Vec<DeliveryItem> = a
        .iter()
        .filter(|(code, _)| b.contains_key(*code) && !scanned.contains_key(*code))
        .map(|(_, row)| delivery_item(*row))
        .collect();

    let fuera_cobertura: Vec<DeliveryItem> = a
        .iter()
        .filter(|(code, _)| !b.contains_key(*code))
        .map(|(_, row)| delivery_item(*row))
        .collect();

    let previo: Vec<RouteItem> = b
        .iter()
        .filter(|(code, _)| !a.contains_key(*code))
        .map(|(code, row)| RouteItem {
            tracking_code: row.tracking_code.clone(),
            route_code: row.route_code.clone(),
            carrier_name: row.carrier_name.clone(),
            delivery_address: row.delivery_address.clone(),
            driver_name: row.driver_name.clone(),
            scanned: scanned.contains_key(*code),
        })
        .collect();

    let mut sobrante: Vec<SurplusItem> = scans
        .iter()
        .filter(|s| s.status == ScanStatus::Sobrante)
        .map(|s| SurplusItem {
            tracking_code: s.tracking_code.clone(),
            scanned_by: s.scanned_by.clone(),
            scanned_at: s.scanned_at,
        })
        .collect();
    sobrante.sort_by(|x, y| x.tracking_code.cmp(&y.tracking_code));

    let ok = scans.iter().filter(|s| s.status == ScanStatus::Ok).count();

    Reconciliation {
        counts: ReportCounts {
            manifest_a: a.len(),
            manifest_b: b.len(),
            scanned: scans.len(),
            ok,
            faltantes: faltantes.len(),
            sobrante: sobrante.len(),
            fuera_cobertura: fuera_cobertura.len(),
            previo: previo.len(),
            duplicate_scans: 0,
        },
        faltantes,
        fuera_cobertura,
        previo,
        sobrante,
    }
}
