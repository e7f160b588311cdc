//! HTTP API handlers for wlms-sv

pub mod classification;
pub mod health;
pub mod identity;
pub mod path;
pub mod report;
pub mod scans;
pub mod shipments;

pub use health::health_routes;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};

use crate::AppState;

/// Largest accepted classification upload
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Build shipment verification routes
pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/shipments/:id", get(shipments::get_shipment))
        .route("/api/shipments/:id/verification", post(shipments::start_verification))
        .route("/api/shipments/:id/finalize", post(shipments::finalize_shipment))
        .route(
            "/api/shipments/:id/scans",
            post(scans::submit_scan).get(scans::list_scans),
        )
        .route(
            "/api/shipments/:id/classification",
            post(classification::upload_classification)
                .get(classification::latest_classification)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/shipments/:id/classification/:batch_id",
            get(classification::get_classification_batch),
        )
        .route("/api/shipments/:id/report", get(report::get_report))
}
