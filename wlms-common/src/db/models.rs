//! Database models
//!
//! Identifiers are stored as UUID text and timestamps as RFC 3339 text, so
//! rows are decoded by hand rather than through `FromRow` derives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::{time, Error, Result};

/// Shipment lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Collecting,
    Verifying,
    Finalized,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Collecting => "collecting",
            ShipmentStatus::Verifying => "verifying",
            ShipmentStatus::Finalized => "finalized",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "collecting" => Ok(ShipmentStatus::Collecting),
            "verifying" => Ok(ShipmentStatus::Verifying),
            "finalized" => Ok(ShipmentStatus::Finalized),
            other => Err(Error::Internal(format!("Unknown shipment status '{}'", other))),
        }
    }
}

/// Classification of one scanned package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    /// Expected by both manifests
    Ok,
    /// Expected by neither manifest, or already scanned
    Sobrante,
    /// Expected by Manifest A only
    FueraCobertura,
    /// Expected by Manifest B only
    Previo,
}

impl ScanStatus {
    /// Classify a package by manifest membership
    pub fn classify(in_manifest_a: bool, in_manifest_b: bool) -> Self {
        match (in_manifest_a, in_manifest_b) {
            (true, true) => ScanStatus::Ok,
            (true, false) => ScanStatus::FueraCobertura,
            (false, true) => ScanStatus::Previo,
            (false, false) => ScanStatus::Sobrante,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Ok => "OK",
            ScanStatus::Sobrante => "SOBRANTE",
            ScanStatus::FueraCobertura => "FUERA_COBERTURA",
            ScanStatus::Previo => "PREVIO",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "OK" => Ok(ScanStatus::Ok),
            "SOBRANTE" => Ok(ScanStatus::Sobrante),
            "FUERA_COBERTURA" => Ok(ScanStatus::FueraCobertura),
            "PREVIO" => Ok(ScanStatus::Previo),
            other => Err(Error::Internal(format!("Unknown scan status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub provider_id: String,
    pub status: ShipmentStatus,
    pub duplicate_scans: i64,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Shipment {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let finalized_at: Option<String> = row.try_get("finalized_at")?;
        Ok(Self {
            id: parse_guid(&row.try_get::<String, _>("guid")?)?,
            provider_id: row.try_get("provider_id")?,
            status: ShipmentStatus::parse(&row.try_get::<String, _>("status")?)?,
            duplicate_scans: row.try_get("duplicate_scans")?,
            created_at: time::from_db(&row.try_get::<String, _>("created_at")?)?,
            finalized_at: finalized_at.as_deref().map(time::from_db).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestARow {
    pub id: i64,
    pub shipment_id: Uuid,
    pub tracking_code: String,
    pub buyer_name: Option<String>,
    pub buyer_city: Option<String>,
    pub weight: Option<f64>,
    pub verified: bool,
    pub verification_status: Option<ScanStatus>,
    pub scan_record_id: Option<i64>,
}

impl ManifestARow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let status: Option<String> = row.try_get("verification_status")?;
        Ok(Self {
            id: row.try_get("id")?,
            shipment_id: parse_guid(&row.try_get::<String, _>("shipment_id")?)?,
            tracking_code: row.try_get("tracking_code")?,
            buyer_name: row.try_get("buyer_name")?,
            buyer_city: row.try_get("buyer_city")?,
            weight: row.try_get("weight")?,
            verified: row.try_get::<i64, _>("verified")? != 0,
            verification_status: status.as_deref().map(ScanStatus::parse).transpose()?,
            scan_record_id: row.try_get("scan_record_id")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestBRow {
    pub id: i64,
    pub shipment_id: Uuid,
    pub tracking_code: String,
    pub route_code: Option<String>,
    pub carrier_name: Option<String>,
    pub delivery_address: Option<String>,
    pub driver_name: Option<String>,
    pub verified: bool,
    pub verification_status: Option<ScanStatus>,
    pub scan_record_id: Option<i64>,
}

impl ManifestBRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let status: Option<String> = row.try_get("verification_status")?;
        Ok(Self {
            id: row.try_get("id")?,
            shipment_id: parse_guid(&row.try_get::<String, _>("shipment_id")?)?,
            tracking_code: row.try_get("tracking_code")?,
            route_code: row.try_get("route_code")?,
            carrier_name: row.try_get("carrier_name")?,
            delivery_address: row.try_get("delivery_address")?,
            driver_name: row.try_get("driver_name")?,
            verified: row.try_get::<i64, _>("verified")? != 0,
            verification_status: status.as_deref().map(ScanStatus::parse).transpose()?,
            scan_record_id: row.try_get("scan_record_id")?,
        })
    }
}

/// Durable result of one physical package scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub shipment_id: Uuid,
    /// Normalized (trimmed, upper-cased) tracking code
    pub tracking_code: String,
    pub scanned_by: String,
    pub status: ScanStatus,
    pub scanned_at: DateTime<Utc>,
    pub manifest_a_row_id: Option<i64>,
    pub manifest_b_row_id: Option<i64>,
}

impl ScanRecord {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            shipment_id: parse_guid(&row.try_get::<String, _>("shipment_id")?)?,
            tracking_code: row.try_get("tracking_code")?,
            scanned_by: row.try_get("scanned_by")?,
            status: ScanStatus::parse(&row.try_get::<String, _>("status")?)?,
            scanned_at: time::from_db(&row.try_get::<String, _>("scanned_at")?)?,
            manifest_a_row_id: row.try_get("manifest_a_row_id")?,
            manifest_b_row_id: row.try_get("manifest_b_row_id")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationBatch {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub uploaded_by: String,
    pub row_count: i64,
    pub created_at: DateTime<Utc>,
}

impl ClassificationBatch {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: parse_guid(&row.try_get::<String, _>("guid")?)?,
            shipment_id: parse_guid(&row.try_get::<String, _>("shipment_id")?)?,
            uploaded_by: row.try_get("uploaded_by")?,
            row_count: row.try_get("row_count")?,
            created_at: time::from_db(&row.try_get::<String, _>("created_at")?)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRow {
    pub id: i64,
    pub batch_id: Uuid,
    pub tracking_code: String,
    pub vehicle_id: String,
    /// Visit-order label as written in the uploaded file (display only)
    pub visit_label: Option<String>,
    /// Per-vehicle position in file order, starting at 1
    pub visit_order: i64,
}

impl ClassificationRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            batch_id: parse_guid(&row.try_get::<String, _>("batch_id")?)?,
            tracking_code: row.try_get("tracking_code")?,
            vehicle_id: row.try_get("vehicle_id")?,
            visit_label: row.try_get("visit_label")?,
            visit_order: row.try_get("visit_order")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub provider_id: String,
}

fn parse_guid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Invalid guid '{}': {}", raw, e)))
}
