//! Tracking code normalization
//!
//! Scanners emit codes with stray whitespace and mixed case; manifests are
//! stored normalized, so every lookup goes through [`normalize_tracking_code`].

/// Trim surrounding whitespace and upper-case a raw tracking code
pub fn normalize_tracking_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}
