//! Identity extraction from the fronting auth layer.
//!
//! The node does not authenticate anyone itself. A reverse proxy (or the
//! surrounding application) authenticates the request and injects the
//! principal as headers:
//!
//! - `x-user-id` — required; opaque user identifier.
//! - `x-user-name` — display name; falls back to the user id.
//! - `x-user-admin` — `1` or `true` marks an admin.
//!
//! Requests without `x-user-id` are rejected with 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use helpline_types::Identity;

use crate::api::ApiError;

/// The authenticated principal of a request, as an axum extractor.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl Caller {
    /// Rejects non-admin callers.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err(ApiError::AdminRequired)
        }
    }
}

/// Reads the identity headers, if present and well-formed.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let user_id = header_str(headers, "x-user-id")?.trim();
    if user_id.is_empty() {
        return None;
    }

    let display_name = header_str(headers, "x-user-name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(user_id);

    let is_admin = header_str(headers, "x-user-admin")
        .map(|v| matches!(v.trim(), "1" | "true"))
        .unwrap_or(false);

    Some(Identity::new(user_id, display_name).with_admin(is_admin))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers)
            .map(Caller)
            .ok_or(ApiError::Unauthorized)
    }
}
