use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::services::upstream::{UpstreamError, append_user_id, get_json};

#[derive(Debug, Deserialize)]
struct ServiceDoc {
    owner: String,
}

/// Resolves the owner of the service identity behind a user id.
///
/// Consulted only when team membership does not satisfy the requirement.
#[async_trait]
pub trait OwnerSource: Send + Sync {
    async fn owner(&self, user_id: &str, token: &str) -> Result<String, UpstreamError>;
}

/// Service registry client: `GET <url_base><uid>` returning `{"owner": ...}`.
#[derive(Clone, Debug)]
pub struct ServiceOwnershipClient {
    http: Client,
    url_base: String,
}

impl ServiceOwnershipClient {
    pub fn new(http: Client, url_base: impl Into<String>) -> Self {
        Self {
            http,
            url_base: url_base.into(),
        }
    }
}

#[async_trait]
impl OwnerSource for ServiceOwnershipClient {
    async fn owner(&self, user_id: &str, token: &str) -> Result<String, UpstreamError> {
        let url = append_user_id(&self.url_base, user_id);
        let doc: ServiceDoc = get_json(&self.http, &url, token).await?;
        Ok(doc.owner)
    }
}
