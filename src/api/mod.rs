/*
 * Responsibility
 * - the route table: every path goes to the backend proxy
 */
use axum::Router;

use crate::state::AppState;

pub mod proxy;

pub fn routes() -> Router<AppState> {
    Router::new().fallback(proxy::forward)
}
