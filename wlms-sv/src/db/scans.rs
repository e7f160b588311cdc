//! Scan record queries
//!
//! `insert_scan` is a plain INSERT. A concurrent scanner that already recorded
//! the same code makes it fail with a UNIQUE violation, which the caller turns
//! into the duplicate-scan response. No existence check precedes the insert.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;
use wlms_common::db::{ScanRecord, ScanStatus};
use wlms_common::{time, Result};

const SCAN_COLUMNS: &str = "id, shipment_id, tracking_code, scanned_by, status, scanned_at, \
     manifest_a_row_id, manifest_b_row_id";

/// Scan record about to be written
#[derive(Debug, Clone)]
pub struct NewScan {
    pub shipment_id: Uuid,
    pub tracking_code: String,
    pub scanned_by: String,
    pub status: ScanStatus,
    pub scanned_at: DateTime<Utc>,
    pub manifest_a_row_id: Option<i64>,
    pub manifest_b_row_id: Option<i64>,
}

pub async fn insert_scan(pool: &SqlitePool, scan: &NewScan) -> Result<ScanRecord> {
    let result = sqlx::query(
        r#"
        INSERT INTO scan_records (
            shipment_id, tracking_code, scanned_by, status, scanned_at,
            manifest_a_row_id, manifest_b_row_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(scan.shipment_id.to_string())
    .bind(&scan.tracking_code)
    .bind(&scan.scanned_by)
    .bind(scan.status.as_str())
    .bind(time::to_db(&scan.scanned_at))
    .bind(scan.manifest_a_row_id)
    .bind(scan.manifest_b_row_id)
    .execute(pool)
    .await?;

    Ok(ScanRecord {
        id: result.last_insert_rowid(),
        shipment_id: scan.shipment_id,
        tracking_code: scan.tracking_code.clone(),
        scanned_by: scan.scanned_by.clone(),
        status: scan.status,
        scanned_at: scan.scanned_at,
        manifest_a_row_id: scan.manifest_a_row_id,
        manifest_b_row_id: scan.manifest_b_row_id,
    })
}

pub async fn find_scan(
    pool: &SqlitePool,
    shipment_id: Uuid,
    tracking_code: &str,
) -> Result<Option<ScanRecord>> {
    let sql = format!(
        "SELECT {} FROM scan_records WHERE shipment_id = ? AND tracking_code = ?",
        SCAN_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(shipment_id.to_string())
        .bind(tracking_code)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ScanRecord::from_row).transpose()
}

pub async fn list_scans(pool: &SqlitePool, shipment_id: Uuid) -> Result<Vec<ScanRecord>> {
    let sql = format!(
        "SELECT {} FROM scan_records WHERE shipment_id = ? ORDER BY scanned_at, id",
        SCAN_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(shipment_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(ScanRecord::from_row).collect()
}

/// Tracking codes of every OK scan in the shipment
pub async fn ok_tracking_codes(pool: &SqlitePool, shipment_id: Uuid) -> Result<HashSet<String>> {
    let codes: Vec<String> = sqlx::query_scalar(
        "SELECT tracking_code FROM scan_records WHERE shipment_id = ? AND status = 'OK'",
    )
    .bind(shipment_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(codes.into_iter().collect())
}
