//! Shipment lifecycle queries

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use wlms_common::db::Shipment;
use wlms_common::{time, Result};

pub async fn load_shipment(pool: &SqlitePool, shipment_id: Uuid) -> Result<Option<Shipment>> {
    let row = sqlx::query(
        r#"
        SELECT guid, provider_id, status, duplicate_scans, created_at, finalized_at
        FROM shipments
        WHERE guid = ?
        "#,
    )
    .bind(shipment_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Shipment::from_row).transpose()
}

/// collecting → verifying. Returns false when the shipment was not collecting.
pub async fn promote_to_verifying(pool: &SqlitePool, shipment_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE shipments SET status = 'verifying' WHERE guid = ? AND status = 'collecting'",
    )
    .bind(shipment_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Any open stage → finalized. Returns false when already finalized.
pub async fn finalize(
    pool: &SqlitePool,
    shipment_id: Uuid,
    finalized_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE shipments
        SET status = 'finalized', finalized_at = ?
        WHERE guid = ? AND status != 'finalized'
        "#,
    )
    .bind(time::to_db(&finalized_at))
    .bind(shipment_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Count one duplicate-scan anomaly
pub async fn record_duplicate_scan(pool: &SqlitePool, shipment_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE shipments SET duplicate_scans = duplicate_scans + 1 WHERE guid = ?")
        .bind(shipment_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Live sizes: (manifest A rows, manifest B rows, scan records)
pub async fn count_contents(pool: &SqlitePool, shipment_id: Uuid) -> Result<(i64, i64, i64)> {
    let counts: (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM manifest_a_rows WHERE shipment_id = ?),
            (SELECT COUNT(*) FROM manifest_b_rows WHERE shipment_id = ?),
            (SELECT COUNT(*) FROM scan_records WHERE shipment_id = ?)
        "#,
    )
    .bind(shipment_id.to_string())
    .bind(shipment_id.to_string())
    .bind(shipment_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
