//! Error types for wlms-sv
//!
//! Every failure is recovered at the operation boundary and rendered as
//! `{"error": {"code": "<KIND>", "message": "..."}}`. A duplicate scan is not
//! an error and has no variant here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No caller identity on the request (401)
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Caller's provider does not own the shipment (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown shipment or batch (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed or empty upload, missing scan fields (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scanned code belongs to no manifest of the shipment (422)
    #[error("Out of scope: {0}")]
    OutOfScope(String),

    /// Operation not allowed in the shipment's lifecycle stage (409)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Upload produced no usable rows (422)
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// wlms-common error
    #[error("Common error: {0}")]
    Common(#[from] wlms_common::Error),
}

impl ApiError {
    /// Machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotAuthorized(_) => "NOT_AUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::OutOfScope(_) => "OUT_OF_SCOPE",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::EmptyResult(_) => "EMPTY_RESULT",
            ApiError::Internal(_) | ApiError::Other(_) => "INTERNAL_ERROR",
            ApiError::Common(wlms_common::Error::NotFound(_)) => "NOT_FOUND",
            ApiError::Common(wlms_common::Error::InvalidInput(_)) => "INVALID_INPUT",
            ApiError::Common(wlms_common::Error::InvalidState(_)) => "INVALID_STATE",
            ApiError::Common(wlms_common::Error::Database(_)) => "DATABASE_ERROR",
            ApiError::Common(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            "NOT_AUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_INPUT" => StatusCode::BAD_REQUEST,
            "OUT_OF_SCOPE" | "EMPTY_RESULT" => StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_STATE" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        assert_eq!(ApiError::NotAuthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::OutOfScope("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::InvalidState("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::EmptyResult("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_common_errors_keep_their_kind() {
        let not_found = ApiError::from(wlms_common::Error::NotFound("batch".into()));
        assert_eq!(not_found.code(), "NOT_FOUND");
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let frozen = ApiError::from(wlms_common::Error::InvalidState("frozen".into()));
        assert_eq!(frozen.status(), StatusCode::CONFLICT);

        let internal = ApiError::from(wlms_common::Error::Internal("boom".into()));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
