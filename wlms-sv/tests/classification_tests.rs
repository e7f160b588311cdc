//! Classification upload tests against a real database

mod helpers;

use helpers::*;
use rust_xlsxwriter::Workbook;
use uuid::Uuid;
use wlms_sv::db;
use wlms_sv::services::classification::{get_classification_batch, latest_classification};
use wlms_sv::services::shipments::finalize_shipment;
use wlms_sv::services::{submit_scan, upload_classification};
use wlms_sv::ApiError;

/// Shipment with the given codes verified OK and then finalized
async fn finalized_with_ok_scans(codes: &[&str]) -> TestContext {
    let ctx = setup_with_manifests(codes, codes).await;
    for code in codes {
        submit_scan(&ctx.state, ctx.shipment_id(), code, &ana()).await.unwrap();
    }
    finalize_shipment(&ctx.state, ctx.shipment_id(), &ana()).await.unwrap();
    ctx
}

fn workbook(rows: &[[Option<&str>; 3]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Codigo").unwrap();
    sheet.write_string(0, 1, "Vehiculo").unwrap();
    sheet.write_string(0, 2, "Orden").unwrap();

    for (i, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if let Some(text) = cell {
                sheet.write_string(i as u32 + 1, col as u16, *text).unwrap();
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

#[tokio::test]
async fn test_upload_before_finalize_is_rejected() {
    let ctx = setup_with_manifests(&["P1"], &["P1"]).await;
    submit_scan(&ctx.state, ctx.shipment_id(), "P1", &ana()).await.unwrap();

    let csv = b"codigo,vehiculo,orden\nP1,V1,1\n";
    let result = upload_classification(&ctx.state, ctx.shipment_id(), csv, &ana()).await;
    assert!(matches!(result, Err(ApiError::InvalidState(_))));

    let latest = db::classification::latest_batch(&ctx.state.db, ctx.shipment_id())
        .await
        .unwrap();
    assert!(latest.is_none());
}

#[tokio::test]
async fn test_workbook_upload_filters_and_counts() {
    let ctx = finalized_with_ok_scans(&["P1", "P2", "P3", "P4", "P5"]).await;

    let bytes = workbook(&[
        [Some("P1"), Some("TRUCK-1"), Some("INICIO")],
        [Some("p2"), Some("TRUCK-1"), Some("2")],
        [Some("NEVER-1"), Some("TRUCK-1"), Some("3")],
        [Some("P3"), Some("TRUCK-2"), Some("1")],
        [Some("P4"), None, Some("1")],
        [Some("NEVER-2"), Some("TRUCK-2"), None],
        [Some("P5"), Some("TRUCK-2"), Some("9")],
        [Some("P4"), Some("TRUCK-1"), None],
    ]);

    let summary = upload_classification(&ctx.state, ctx.shipment_id(), &bytes, &ana())
        .await
        .unwrap();

    assert_eq!(summary.total_rows, 8);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.skipped_not_ok, 2);
    assert_eq!(summary.skipped_invalid, 1);
    assert_eq!(summary.vehicles, 2);
    assert_eq!(summary.rows_per_vehicle.get("TRUCK-1"), Some(&3));
    assert_eq!(summary.rows_per_vehicle.get("TRUCK-2"), Some(&2));
}

#[tokio::test]
async fn test_stored_visit_orders_are_gap_free_per_vehicle() {
    let ctx = finalized_with_ok_scans(&["P1", "P2", "P3", "P4"]).await;

    let csv = b"codigo,vehiculo,orden\nP1,V1,INICIO\nP2,V2,5\nGHOST,V1,2\nP3,V1,7\nP4,V1,\n";
    let summary = upload_classification(&ctx.state, ctx.shipment_id(), csv, &ana())
        .await
        .unwrap();

    let rows = db::classification::load_batch_rows(&ctx.state.db, summary.batch_id)
        .await
        .unwrap();
    let v1: Vec<(String, i64)> = rows
        .iter()
        .filter(|r| r.vehicle_id == "V1")
        .map(|r| (r.tracking_code.clone(), r.visit_order))
        .collect();
    assert_eq!(
        v1,
        vec![("P1".to_string(), 1), ("P3".to_string(), 2), ("P4".to_string(), 3)]
    );

    let p2 = rows.iter().find(|r| r.tracking_code == "P2").unwrap();
    assert_eq!(p2.visit_order, 1);
    assert_eq!(p2.visit_label.as_deref(), Some("5"));
}

#[tokio::test]
async fn test_only_ok_scans_are_classifiable() {
    let ctx = setup_with_manifests(&["OK1", "FC1"], &["OK1", "PV1"]).await;
    let id = ctx.shipment_id();
    for code in ["OK1", "FC1", "PV1"] {
        submit_scan(&ctx.state, id, code, &ana()).await.unwrap();
    }
    finalize_shipment(&ctx.state, id, &ana()).await.unwrap();

    let csv = b"codigo,vehiculo,orden\nOK1,V1,1\nFC1,V1,2\nPV1,V1,3\n";
    let summary = upload_classification(&ctx.state, id, csv, &ana()).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped_not_ok, 2);
}

#[tokio::test]
async fn test_upload_with_no_usable_rows_is_empty_result() {
    let ctx = finalized_with_ok_scans(&["P1"]).await;

    let csv = b"codigo,vehiculo,orden\nGHOST,V1,1\nP1,,2\n";
    let result = upload_classification(&ctx.state, ctx.shipment_id(), csv, &ana()).await;
    assert!(matches!(result, Err(ApiError::EmptyResult(_))));

    let latest = db::classification::latest_batch(&ctx.state.db, ctx.shipment_id())
        .await
        .unwrap();
    assert!(latest.is_none());
}

#[tokio::test]
async fn test_empty_upload_is_invalid_input() {
    let ctx = finalized_with_ok_scans(&["P1"]).await;

    let result = upload_classification(&ctx.state, ctx.shipment_id(), b"", &ana()).await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
}

#[tokio::test]
async fn test_reupload_replaces_previous_batch() {
    let ctx = finalized_with_ok_scans(&["P1", "P2"]).await;
    let id = ctx.shipment_id();

    let first = upload_classification(&ctx.state, id, b"c,v,o\nP1,V1,1\nP2,V1,2\n", &ana())
        .await
        .unwrap();
    let second = upload_classification(&ctx.state, id, b"c,v,o\nP2,V9,1\n", &luis())
        .await
        .unwrap();

    let latest = latest_classification(&ctx.state, id, &ana()).await.unwrap();
    assert_eq!(latest.batch.id, second.batch_id);
    assert_eq!(latest.batch.uploaded_by, "u-luis");
    assert_eq!(latest.rows.len(), 1);
    assert_eq!(latest.rows[0].vehicle_id, "V9");

    let superseded = get_classification_batch(&ctx.state, id, first.batch_id, &ana()).await;
    assert!(matches!(superseded, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_batch_lookup_checks_ownership_and_existence() {
    let ctx = finalized_with_ok_scans(&["P1"]).await;
    let id = ctx.shipment_id();

    assert!(matches!(
        latest_classification(&ctx.state, id, &ana()).await,
        Err(ApiError::NotFound(_))
    ));

    let summary = upload_classification(&ctx.state, id, b"c,v,o\nP1,V1,1\n", &ana())
        .await
        .unwrap();

    let view = get_classification_batch(&ctx.state, id, summary.batch_id, &ana())
        .await
        .unwrap();
    assert_eq!(view.batch.row_count, 1);
    assert_eq!(view.rows[0].tracking_code, "P1");

    assert!(matches!(
        get_classification_batch(&ctx.state, id, Uuid::new_v4(), &ana()).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        get_classification_batch(&ctx.state, id, summary.batch_id, &outsider()).await,
        Err(ApiError::Forbidden(_))
    ));
}
