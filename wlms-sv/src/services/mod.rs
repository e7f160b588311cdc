//! Verification engines and shipment lifecycle

pub mod classification;
pub mod classification_file;
pub mod report;
pub mod scan_ingest;
pub mod shipments;

pub use classification::{upload_classification, ClassificationSummary};
pub use report::{build_report, ReconciliationReport};
pub use scan_ingest::{submit_scan, ScanOutcome};

use serde::{Deserialize, Serialize};

/// Identity resolved by the upstream session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub provider_id: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            provider_id: provider_id.into(),
        }
    }
}
