//! Manifest A / Manifest B queries
//!
//! Manifests are read-only here except for the cached verification columns,
//! which are best-effort and never consulted for report counts.

use sqlx::SqlitePool;
use uuid::Uuid;
use wlms_common::db::{ManifestARow, ManifestBRow, ScanStatus};
use wlms_common::Result;

const MANIFEST_A_COLUMNS: &str = "id, shipment_id, tracking_code, buyer_name, buyer_city, weight, \
     verified, verification_status, scan_record_id";

const MANIFEST_B_COLUMNS: &str = "id, shipment_id, tracking_code, route_code, carrier_name, \
     delivery_address, driver_name, verified, verification_status, scan_record_id";

pub async fn find_manifest_a_row(
    pool: &SqlitePool,
    shipment_id: Uuid,
    tracking_code: &str,
) -> Result<Option<ManifestARow>> {
    let sql = format!(
        "SELECT {} FROM manifest_a_rows WHERE shipment_id = ? AND tracking_code = ?",
        MANIFEST_A_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(shipment_id.to_string())
        .bind(tracking_code)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ManifestARow::from_row).transpose()
}

pub async fn find_manifest_b_row(
    pool: &SqlitePool,
    shipment_id: Uuid,
    tracking_code: &str,
) -> Result<Option<ManifestBRow>> {
    let sql = format!(
        "SELECT {} FROM manifest_b_rows WHERE shipment_id = ? AND tracking_code = ?",
        MANIFEST_B_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(shipment_id.to_string())
        .bind(tracking_code)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ManifestBRow::from_row).transpose()
}

pub async fn load_manifest_a_row(pool: &SqlitePool, id: i64) -> Result<Option<ManifestARow>> {
    let sql = format!("SELECT {} FROM manifest_a_rows WHERE id = ?", MANIFEST_A_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.as_ref().map(ManifestARow::from_row).transpose()
}

pub async fn load_manifest_b_row(pool: &SqlitePool, id: i64) -> Result<Option<ManifestBRow>> {
    let sql = format!("SELECT {} FROM manifest_b_rows WHERE id = ?", MANIFEST_B_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.as_ref().map(ManifestBRow::from_row).transpose()
}

pub async fn list_manifest_a(pool: &SqlitePool, shipment_id: Uuid) -> Result<Vec<ManifestARow>> {
    let sql = format!(
        "SELECT {} FROM manifest_a_rows WHERE shipment_id = ? ORDER BY tracking_code",
        MANIFEST_A_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(shipment_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(ManifestARow::from_row).collect()
}

pub async fn list_manifest_b(pool: &SqlitePool, shipment_id: Uuid) -> Result<Vec<ManifestBRow>> {
    let sql = format!(
        "SELECT {} FROM manifest_b_rows WHERE shipment_id = ? ORDER BY tracking_code",
        MANIFEST_B_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(shipment_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(ManifestBRow::from_row).collect()
}

pub async fn mark_manifest_a_verified(
    pool: &SqlitePool,
    row_id: i64,
    status: ScanStatus,
    scan_record_id: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE manifest_a_rows SET verified = 1, verification_status = ?, scan_record_id = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(scan_record_id)
    .bind(row_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn mark_manifest_b_verified(
    pool: &SqlitePool,
    row_id: i64,
    status: ScanStatus,
    scan_record_id: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE manifest_b_rows SET verified = 1, verification_status = ?, scan_record_id = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(scan_record_id)
    .bind(row_id)
    .execute(pool)
    .await?;

    Ok(())
}
