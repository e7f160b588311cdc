//! Database initialization
//!
//! Every table is created idempotently so that any WLMS process (the manifest
//! pipeline or the verification service) may be the first to open the file.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT_MS: u64 = 250;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas set through connect options apply to every connection in the
    // pool, not just the one that happens to run a PRAGMA statement.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all WLMS tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_shipments_table(pool).await?;
    create_manifest_tables(pool).await?;
    create_scan_records_table(pool).await?;
    create_classification_tables(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            provider_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_shipments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shipments (
            guid TEXT PRIMARY KEY,
            provider_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'collecting'
                CHECK (status IN ('collecting', 'verifying', 'finalized')),
            duplicate_scans INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            finalized_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_manifest_tables(pool: &SqlitePool) -> Result<()> {
    // Manifest A ("pre-alerta"): expected delivery items
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manifest_a_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shipment_id TEXT NOT NULL REFERENCES shipments(guid) ON DELETE CASCADE,
            tracking_code TEXT NOT NULL,
            buyer_name TEXT,
            buyer_city TEXT,
            weight REAL,
            verified INTEGER NOT NULL DEFAULT 0,
            verification_status TEXT,
            scan_record_id INTEGER REFERENCES scan_records(id) ON DELETE SET NULL,
            UNIQUE (shipment_id, tracking_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Manifest B ("pre-ruteo"): expected route assignments
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manifest_b_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shipment_id TEXT NOT NULL REFERENCES shipments(guid) ON DELETE CASCADE,
            tracking_code TEXT NOT NULL,
            route_code TEXT,
            carrier_name TEXT,
            delivery_address TEXT,
            driver_name TEXT,
            verified INTEGER NOT NULL DEFAULT 0,
            verification_status TEXT,
            scan_record_id INTEGER REFERENCES scan_records(id) ON DELETE SET NULL,
            UNIQUE (shipment_id, tracking_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_scan_records_table(pool: &SqlitePool) -> Result<()> {
    // UNIQUE (shipment_id, tracking_code) is the sole arbiter of which
    // concurrent scanner recorded a package first.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shipment_id TEXT NOT NULL REFERENCES shipments(guid) ON DELETE CASCADE,
            tracking_code TEXT NOT NULL,
            scanned_by TEXT NOT NULL,
            status TEXT NOT NULL
                CHECK (status IN ('OK', 'SOBRANTE', 'FUERA_COBERTURA', 'PREVIO')),
            scanned_at TEXT NOT NULL,
            manifest_a_row_id INTEGER REFERENCES manifest_a_rows(id) ON DELETE SET NULL,
            manifest_b_row_id INTEGER REFERENCES manifest_b_rows(id) ON DELETE SET NULL,
            UNIQUE (shipment_id, tracking_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scan_records_status ON scan_records(shipment_id, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_classification_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classification_batches (
            guid TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipments(guid) ON DELETE CASCADE,
            uploaded_by TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classification_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES classification_batches(guid) ON DELETE CASCADE,
            tracking_code TEXT NOT NULL,
            vehicle_id TEXT NOT NULL,
            visit_label TEXT,
            visit_order INTEGER NOT NULL,
            UNIQUE (batch_id, vehicle_id, visit_order)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_classification_rows_code ON classification_rows(batch_id, tracking_code)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
