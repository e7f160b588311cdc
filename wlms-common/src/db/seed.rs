//! Write paths owned by the manifest pipeline and the session layer
//!
//! The verification service only reads manifests and users; these helpers are
//! how the upstream processes (and the test suites) populate them.
//!
//! Manifests are frozen once scanning starts: a scan is classified against the
//! manifests present at that moment, and a later load would leave its stored
//! status inconsistent with the report's partition.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::models::{Shipment, ShipmentStatus, User};
use crate::{normalize_tracking_code, time, Error, Result};

/// One Manifest A ("pre-alerta") line as delivered by the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewManifestARow {
    pub tracking_code: String,
    pub buyer_name: Option<String>,
    pub buyer_city: Option<String>,
    pub weight: Option<f64>,
}

/// One Manifest B ("pre-ruteo") line as delivered by the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewManifestBRow {
    pub tracking_code: String,
    pub route_code: Option<String>,
    pub carrier_name: Option<String>,
    pub delivery_address: Option<String>,
    pub driver_name: Option<String>,
}

/// Create a shipment in `collecting` status
pub async fn create_shipment(pool: &SqlitePool, provider_id: &str) -> Result<Shipment> {
    let shipment = Shipment {
        id: Uuid::new_v4(),
        provider_id: provider_id.to_string(),
        status: ShipmentStatus::Collecting,
        duplicate_scans: 0,
        created_at: time::now(),
        finalized_at: None,
    };

    sqlx::query(
        "INSERT INTO shipments (guid, provider_id, status, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(shipment.id.to_string())
    .bind(&shipment.provider_id)
    .bind(shipment.status.as_str())
    .bind(time::to_db(&shipment.created_at))
    .execute(pool)
    .await?;

    tracing::info!(shipment_id = %shipment.id, provider_id, "Shipment created");
    Ok(shipment)
}

/// Load Manifest A rows; re-delivered codes refresh their details
pub async fn insert_manifest_a_rows(
    pool: &SqlitePool,
    shipment_id: Uuid,
    rows: &[NewManifestARow],
) -> Result<u64> {
    let mut tx = pool.begin().await?;
    ensure_manifests_open(&mut tx, shipment_id).await?;
    let mut written = 0u64;

    for row in rows {
        let code = normalize_tracking_code(&row.tracking_code);
        if code.is_empty() {
            return Err(Error::InvalidInput("Manifest A row without tracking code".to_string()));
        }

        written += sqlx::query(
            r#"
            INSERT INTO manifest_a_rows (shipment_id, tracking_code, buyer_name, buyer_city, weight)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(shipment_id, tracking_code) DO UPDATE SET
                buyer_name = excluded.buyer_name,
                buyer_city = excluded.buyer_city,
                weight = excluded.weight
            "#,
        )
        .bind(shipment_id.to_string())
        .bind(&code)
        .bind(&row.buyer_name)
        .bind(&row.buyer_city)
        .bind(row.weight)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// Load Manifest B rows; re-delivered codes refresh their details
pub async fn insert_manifest_b_rows(
    pool: &SqlitePool,
    shipment_id: Uuid,
    rows: &[NewManifestBRow],
) -> Result<u64> {
    let mut tx = pool.begin().await?;
    ensure_manifests_open(&mut tx, shipment_id).await?;
    let mut written = 0u64;

    for row in rows {
        let code = normalize_tracking_code(&row.tracking_code);
        if code.is_empty() {
            return Err(Error::InvalidInput("Manifest B row without tracking code".to_string()));
        }

        written += sqlx::query(
            r#"
            INSERT INTO manifest_b_rows
                (shipment_id, tracking_code, route_code, carrier_name, delivery_address, driver_name)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(shipment_id, tracking_code) DO UPDATE SET
                route_code = excluded.route_code,
                carrier_name = excluded.carrier_name,
                delivery_address = excluded.delivery_address,
                driver_name = excluded.driver_name
            "#,
        )
        .bind(shipment_id.to_string())
        .bind(&code)
        .bind(&row.route_code)
        .bind(&row.carrier_name)
        .bind(&row.delivery_address)
        .bind(&row.driver_name)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// Manifests may only change while the shipment is collecting and unscanned
async fn ensure_manifests_open(conn: &mut SqliteConnection, shipment_id: Uuid) -> Result<()> {
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM shipments WHERE guid = ?")
        .bind(shipment_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    let status = match status {
        Some(raw) => ShipmentStatus::parse(&raw)?,
        None => return Err(Error::NotFound(format!("Shipment {}", shipment_id))),
    };

    let scans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_records WHERE shipment_id = ?")
        .bind(shipment_id.to_string())
        .fetch_one(&mut *conn)
        .await?;

    if status != ShipmentStatus::Collecting || scans > 0 {
        return Err(Error::InvalidState(format!(
            "Manifests of shipment {} are frozen (status: {}, scans: {})",
            shipment_id,
            status.as_str(),
            scans
        )));
    }

    Ok(())
}

/// Insert or refresh a user known to the session layer
pub async fn upsert_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (guid, display_name, provider_id) VALUES (?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            display_name = excluded.display_name,
            provider_id = excluded.provider_id
        "#,
    )
    .bind(&user.id)
    .bind(&user.display_name)
    .bind(&user.provider_id)
    .execute(pool)
    .await?;

    Ok(())
}
