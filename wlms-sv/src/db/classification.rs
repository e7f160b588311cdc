//! Classification batch queries

use sqlx::SqlitePool;
use uuid::Uuid;
use wlms_common::db::{ClassificationBatch, ClassificationRow};
use wlms_common::{time, Result};

const BATCH_COLUMNS: &str = "guid, shipment_id, uploaded_by, row_count, created_at";

/// Classification row about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClassificationRow {
    pub tracking_code: String,
    pub vehicle_id: String,
    pub visit_label: Option<String>,
    pub visit_order: i64,
}

/// True when any classification batch of the shipment lists the code
pub async fn is_classified(pool: &SqlitePool, shipment_id: Uuid, tracking_code: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1
        FROM classification_rows r
        JOIN classification_batches b ON b.guid = r.batch_id
        WHERE b.shipment_id = ? AND r.tracking_code = ?
        LIMIT 1
        "#,
    )
    .bind(shipment_id.to_string())
    .bind(tracking_code)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Replace every batch of the shipment with `batch` in one transaction
///
/// Returns the number of superseded batches.
pub async fn replace_batch(
    pool: &SqlitePool,
    batch: &ClassificationBatch,
    rows: &[NewClassificationRow],
) -> Result<u64> {
    let mut tx = pool.begin().await?;

    // Rows go with their batch through ON DELETE CASCADE
    let superseded = sqlx::query("DELETE FROM classification_batches WHERE shipment_id = ?")
        .bind(batch.shipment_id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query(
        r#"
        INSERT INTO classification_batches (guid, shipment_id, uploaded_by, row_count, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch.id.to_string())
    .bind(batch.shipment_id.to_string())
    .bind(&batch.uploaded_by)
    .bind(batch.row_count)
    .bind(time::to_db(&batch.created_at))
    .execute(&mut *tx)
    .await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO classification_rows (batch_id, tracking_code, vehicle_id, visit_label, visit_order)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch.id.to_string())
        .bind(&row.tracking_code)
        .bind(&row.vehicle_id)
        .bind(&row.visit_label)
        .bind(row.visit_order)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(superseded)
}

pub async fn load_batch(
    pool: &SqlitePool,
    shipment_id: Uuid,
    batch_id: Uuid,
) -> Result<Option<ClassificationBatch>> {
    let sql = format!(
        "SELECT {} FROM classification_batches WHERE guid = ? AND shipment_id = ?",
        BATCH_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(batch_id.to_string())
        .bind(shipment_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ClassificationBatch::from_row).transpose()
}

pub async fn latest_batch(pool: &SqlitePool, shipment_id: Uuid) -> Result<Option<ClassificationBatch>> {
    let sql = format!(
        "SELECT {} FROM classification_batches WHERE shipment_id = ? ORDER BY created_at DESC LIMIT 1",
        BATCH_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(shipment_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ClassificationBatch::from_row).transpose()
}

pub async fn load_batch_rows(pool: &SqlitePool, batch_id: Uuid) -> Result<Vec<ClassificationRow>> {
    let rows = sqlx::query(
        r#"
        SELECT id, batch_id, tracking_code, vehicle_id, visit_label, visit_order
        FROM classification_rows
        WHERE batch_id = ?
        ORDER BY vehicle_id, visit_order
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(ClassificationRow::from_row).collect()
}
