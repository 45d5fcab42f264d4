use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::services::upstream::{UpstreamError, get_json};

/// Identity returned by the token validation service.
///
/// Unknown fields are ignored. A missing `realm` or `scope` decodes as empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityDocument {
    #[serde(rename = "uid")]
    pub user_id: String,
    #[serde(default)]
    pub realm: String,
    #[serde(rename = "scope", default)]
    pub scopes: BTreeSet<String>,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    /// The service answered, but not with 200.
    #[error("invalid token")]
    InvalidToken,
    #[error("token validation service unreachable or malformed response: {0}")]
    ServiceAccess(#[source] UpstreamError),
}

impl From<UpstreamError> for ValidationError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Status(_) => ValidationError::InvalidToken,
            other => ValidationError::ServiceAccess(other),
        }
    }
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<IdentityDocument, ValidationError>;
}

/// Token introspection over HTTP: `GET <url>` with the token as bearer credential.
#[derive(Clone, Debug)]
pub struct ValidationClient {
    http: Client,
    url: String,
}

impl ValidationClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenValidator for ValidationClient {
    async fn validate(&self, token: &str) -> Result<IdentityDocument, ValidationError> {
        Ok(get_json(&self.http, &self.url, token).await?)
    }
}
