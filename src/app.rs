/*
 * Responsibility
 * - logging setup → Config → dependencies → Router
 * - middleware order (http → audit → timeout → auth → basic_auth → proxy)
 * - start with axum::serve()
 */
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tracing_subscriber::EnvFilter;

use crate::{
    api,
    config::Config,
    middleware,
    services::{audit::AuditLog, auth::build_authorizer, upstream},
    state::{AppState, AuditSettings},
};

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let state = build_state(&config)?;

    let app = build_router(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(
        addr = %config.addr,
        backend = %config.backend_url,
        auth = config.auth.as_ref().map(|a| a.filter.check().filter_name()),
        "proxy listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn build_state(config: &Config) -> Result<AppState> {
    // Validation/team/ownership calls get an explicit per-call timeout;
    // forwarding is bounded by the request timeout instead.
    let upstream_http = upstream::build_client(config.upstream_timeout)?;
    let proxy_http = reqwest::Client::builder().build()?;

    let mut state = AppState::new(config.backend_url.clone(), proxy_http);

    if let Some(auth) = &config.auth {
        state = state.with_auth(build_authorizer(auth, upstream_http)?);
    }

    if let Some(basic) = &config.basic_auth {
        let value = middleware::basic_auth::header_value(&basic.user, &basic.password)?;
        state = state.with_basic_auth(value);
    }

    if let Some(audit) = &config.audit {
        state = state.with_audit(AuditSettings {
            log: Arc::new(AuditLog::open(&audit.output)?),
            max_body: audit.max_body,
            drain_body: audit.drain_body,
        });
    }

    Ok(state)
}

/// Router for `state`: the layers present depend on what is configured.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let mut router = api::routes();

    // Applied innermost first.
    if let Some(value) = state.basic_auth.clone() {
        router = middleware::basic_auth::apply(router, value);
    }
    if let Some(authorizer) = state.auth.clone() {
        router = middleware::auth::access::apply(router, authorizer);
    }
    router = middleware::http::timeout(router, request_timeout);
    if let Some(audit) = state.audit.clone() {
        router = middleware::audit::apply(router, audit);
    }

    middleware::http::apply(router.with_state(state))
}
