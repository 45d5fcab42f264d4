//! Outgoing basic authentication.
//!
//! Replaces the `Authorization` header of the forwarded request with fixed credentials.
//! Sits inside the auth layer, so the caller's bearer token is checked before it is
//! swapped out.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header, header::InvalidHeaderValue},
    middleware::{self, Next},
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::state::AppState;

/// `Basic base64(user:password)`, marked sensitive so it is not printed.
pub fn header_value(user: &str, password: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let encoded = STANDARD.encode(format!("{user}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))?;
    value.set_sensitive(true);
    Ok(value)
}

pub fn apply(router: Router<AppState>, value: HeaderValue) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(value, basic_auth_middleware))
}

async fn basic_auth_middleware(
    State(value): State<HeaderValue>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    req.headers_mut().insert(header::AUTHORIZATION, value);
    next.run(req).await
}
