// crates/server/src/auth.rs
//! Caller identity resolution.
//!
//! Authentication itself happens upstream: the identity-aware proxy in front
//! of this service verifies the session and installs the subject id in the
//! `x-user-id` header. This extractor is the only place that header is read,
//! so swapping the transport (e.g. to a verified JWT claim) touches one file.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// Header carrying the verified identity-provider subject.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match user_id {
            Some(id) => Ok(Caller {
                user_id: id.to_string(),
            }),
            None => Err(ApiError::Unauthorized),
        }
    }
}
