//! # WLMS Common Library
//!
//! Shared code for the WLMS warehouse services including:
//! - Database initialization, schema and models
//! - Configuration loading and root folder resolution
//! - Tracking code normalization
//! - Lock-contention retry for SQLite writes

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod tracking;

pub use error::{Error, Result};
pub use tracking::normalize_tracking_code;
