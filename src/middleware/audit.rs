//! Audit log middleware.
//!
//! Responsibility:
//! - install the StateBag the auth layer writes its outcome into
//! - tee the request body when a body limit is configured
//! - after the inner service answered, write one audit record per request
//!
//! Notes:
//! - must wrap the auth layer, otherwise rejections are not seen
//! - the record is written once the response head is known; the response body keeps
//!   streaming afterwards

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::services::audit::AuditRecord;
use crate::services::auth::StateBag;
use crate::services::body_tee::BodyTee;
use crate::state::{AppState, AuditSettings};

pub fn apply(router: Router<AppState>, audit: AuditSettings) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(audit, audit_middleware))
}

async fn audit_middleware(
    State(audit): State<AuditSettings>,
    OriginalUri(original_uri): OriginalUri,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = original_uri.path().to_string();

    let bag = StateBag::new();
    req.extensions_mut().insert(bag.clone());

    let (req, tee) = if audit.max_body.is_enabled() {
        let (parts, body) = req.into_parts();
        let (body, handle) = BodyTee::new(body, audit.max_body);
        (Request::from_parts(parts, Body::new(body)), Some(handle))
    } else {
        (req, None)
    };

    let response = next.run(req).await;

    let captured = match tee {
        Some(handle) => handle.finish(audit.drain_body).await,
        None => None,
    };

    let record = AuditRecord::new(
        method,
        path,
        response.status().as_u16(),
        bag.outcome(),
        captured,
    );
    audit.log.record(&record);

    response
}
