//! Caller identity extraction
//!
//! The upstream session layer authenticates the operator and forwards the
//! resolved user and owning provider as headers. A request without them never
//! reaches a handler.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::services::Caller;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const PROVIDER_ID_HEADER: &str = "x-provider-id";

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| ApiError::NotAuthorized("missing caller identity".to_string()))?;
        let provider_id = header(PROVIDER_ID_HEADER)
            .ok_or_else(|| ApiError::NotAuthorized("missing caller provider".to_string()))?;

        Ok(Caller::new(user_id, provider_id))
    }
}
