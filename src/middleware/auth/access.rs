//! Bearer token authorization → AuthOutcome into the request's StateBag.
//!
//! - the decision is recorded exactly once, before anything is forwarded
//! - a rejection answers 401 with an empty body; the inner service is never called
//! - an accepted request continues with the StateBag in its extensions

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{AuthOutcome, Authorizer, StateBag};
use crate::state::AppState;

/// Put the authorization check in front of every route of `router`.
///
/// ```ignore
/// let router = api::routes();
/// let router = middleware::auth::access::apply(router, authorizer);
/// ```
pub fn apply(router: Router<AppState>, authorizer: Arc<Authorizer>) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(authorizer, access_middleware))
}

async fn access_middleware(
    State(authorizer): State<Arc<Authorizer>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let outcome = authorizer.decide(req.headers()).await;

    // The audit layer installs the bag when it runs; otherwise start one here.
    let bag = match req.extensions().get::<StateBag>() {
        Some(bag) => bag.clone(),
        None => {
            let bag = StateBag::new();
            req.extensions_mut().insert(bag.clone());
            bag
        }
    };

    if let AuthOutcome::Rejected { user_id, reason } = &outcome {
        tracing::debug!(user_id = %user_id, reason = %reason, "request rejected");
    }

    let authorized = outcome.is_authorized();
    if let Err(outcome) = bag.record(outcome) {
        tracing::warn!(?outcome, "auth outcome already recorded for this request");
        return Err(AppError::Unauthorized);
    }

    if !authorized {
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}
