//! Shared fixtures for wlms-sv integration tests
//!
//! Each test gets its own on-disk SQLite file: concurrent scans need several
//! pooled connections to see the same database, which `:memory:` cannot do.

#![allow(dead_code)]

use tempfile::TempDir;
use uuid::Uuid;
use wlms_common::db::{
    create_shipment, init_database, insert_manifest_a_rows, insert_manifest_b_rows, upsert_user,
    NewManifestARow, NewManifestBRow, Shipment, User,
};
use wlms_sv::services::Caller;
use wlms_sv::AppState;

pub const PROVIDER: &str = "prov-norte";
pub const OTHER_PROVIDER: &str = "prov-sur";

pub struct TestContext {
    // Keeps the database file alive for the test's duration
    _dir: TempDir,
    pub state: AppState,
    pub shipment: Shipment,
}

impl TestContext {
    pub fn shipment_id(&self) -> Uuid {
        self.shipment.id
    }
}

/// Fresh database with one collecting shipment owned by PROVIDER
pub async fn setup() -> TestContext {
    let dir = TempDir::new().expect("temp dir");
    let pool = init_database(&dir.path().join("wlms.db"))
        .await
        .expect("database init");

    for (id, name) in [("u-ana", "Ana Quispe"), ("u-luis", "Luis Rojas")] {
        upsert_user(
            &pool,
            &User {
                id: id.to_string(),
                display_name: name.to_string(),
                provider_id: PROVIDER.to_string(),
            },
        )
        .await
        .expect("user seed");
    }

    let shipment = create_shipment(&pool, PROVIDER).await.expect("shipment seed");

    TestContext {
        _dir: dir,
        state: AppState::new(pool, 5000),
        shipment,
    }
}

/// Fresh database whose shipment has the given manifest codes
pub async fn setup_with_manifests(manifest_a: &[&str], manifest_b: &[&str]) -> TestContext {
    let ctx = setup().await;
    load_manifests(&ctx, manifest_a, manifest_b).await;
    ctx
}

pub async fn load_manifests(ctx: &TestContext, manifest_a: &[&str], manifest_b: &[&str]) {
    let a_rows: Vec<NewManifestARow> = manifest_a
        .iter()
        .map(|code| NewManifestARow {
            tracking_code: code.to_string(),
            buyer_name: Some(format!("Buyer {}", code)),
            buyer_city: Some("Arequipa".to_string()),
            weight: Some(2.5),
        })
        .collect();
    let b_rows: Vec<NewManifestBRow> = manifest_b
        .iter()
        .map(|code| NewManifestBRow {
            tracking_code: code.to_string(),
            route_code: Some("RT-07".to_string()),
            carrier_name: Some("Transportes Andinos".to_string()),
            delivery_address: Some(format!("Av. Ejercito {}", code)),
            driver_name: Some("Jorge Paz".to_string()),
        })
        .collect();

    insert_manifest_a_rows(&ctx.state.db, ctx.shipment.id, &a_rows)
        .await
        .expect("manifest A seed");
    insert_manifest_b_rows(&ctx.state.db, ctx.shipment.id, &b_rows)
        .await
        .expect("manifest B seed");
}

pub fn ana() -> Caller {
    Caller::new("u-ana", PROVIDER)
}

pub fn luis() -> Caller {
    Caller::new("u-luis", PROVIDER)
}

pub fn outsider() -> Caller {
    Caller::new("u-zoe", OTHER_PROVIDER)
}
