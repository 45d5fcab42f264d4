/*
 * Responsibility
 * - shared context attached to the Router (AppState)
 * - cheap to Clone (Arc / Clone-cheap internals)
 * - optional pieces are None when the matching filter is not configured
 */
use std::sync::Arc;

use axum::http::HeaderValue;
use reqwest::Client;
use url::Url;

use crate::services::audit::AuditLog;
use crate::services::auth::Authorizer;
use crate::services::body_tee::TeeLimit;

#[derive(Clone)]
pub struct AuditSettings {
    pub log: Arc<AuditLog>,
    pub max_body: TeeLimit,
    pub drain_body: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Url,
    /// Client used to forward requests to the backend.
    pub http: Client,
    pub auth: Option<Arc<Authorizer>>,
    pub audit: Option<AuditSettings>,
    /// Prepared `Authorization: Basic ...` value for forwarded requests.
    pub basic_auth: Option<HeaderValue>,
}

impl AppState {
    pub fn new(backend: Url, http: Client) -> Self {
        Self {
            backend,
            http,
            auth: None,
            audit: None,
            basic_auth: None,
        }
    }

    pub fn with_auth(mut self, auth: Arc<Authorizer>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_audit(mut self, audit: AuditSettings) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_basic_auth(mut self, value: HeaderValue) -> Self {
        self.basic_auth = Some(value);
        self
    }
}
