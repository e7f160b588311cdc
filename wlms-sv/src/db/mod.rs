//! Database access for wlms-sv
//!
//! Thin query functions over the shared SQLite database. Business rules live
//! in `services`; nothing here decides a classification.

pub mod classification;
pub mod manifests;
pub mod scans;
pub mod shipments;
pub mod users;
