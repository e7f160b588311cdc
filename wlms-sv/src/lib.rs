//! wlms-sv library - Shipment Verification module
//!
//! Scan ingestion, classification enrichment and reconciliation reporting
//! for inbound shipments. Exposed as a library for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database connection pool
    pub db: SqlitePool,
    /// Upper bound for retrying a write under SQLite lock contention
    pub max_lock_wait_ms: u64,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            max_lock_wait_ms,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// `/health` is public; every `/api` route requires caller identity headers.
/// Scanner front-ends are served from another origin, hence permissive CORS.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::shipment_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
