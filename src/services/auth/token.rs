use axum::http::{HeaderMap, header};

use crate::services::auth::outcome::RejectReason;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Returns the token following a case-sensitive `Bearer ` prefix in `Authorization`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, RejectReason> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or(RejectReason::MissingBearerToken)
}
