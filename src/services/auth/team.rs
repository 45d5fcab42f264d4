use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::services::cache::TeamLookupCache;
use crate::services::upstream::{UpstreamError, append_user_id, get_json};

#[derive(Debug, Deserialize)]
struct TeamDoc {
    id: String,
}

/// Resolves the teams a user is a member of.
#[async_trait]
pub trait TeamSource: Send + Sync {
    async fn teams(&self, user_id: &str, token: &str) -> Result<Vec<String>, UpstreamError>;
}

/// Team API client: `GET <url_base><uid>` returning `[{"id": ...}]`.
///
/// Answers from the TTL cache when it can. Concurrent misses for the same user are not
/// coalesced; each one calls the team API and the last write wins.
#[derive(Clone, Debug)]
pub struct TeamClient {
    http: Client,
    url_base: String,
    cache: Arc<TeamLookupCache>,
}

impl TeamClient {
    pub fn new(http: Client, url_base: impl Into<String>, cache: Arc<TeamLookupCache>) -> Self {
        Self {
            http,
            url_base: url_base.into(),
            cache,
        }
    }
}

#[async_trait]
impl TeamSource for TeamClient {
    async fn teams(&self, user_id: &str, token: &str) -> Result<Vec<String>, UpstreamError> {
        if let Some(teams) = self.cache.get(user_id) {
            tracing::debug!(user_id = %user_id, "team cache hit");
            return Ok(teams);
        }

        let url = append_user_id(&self.url_base, user_id);
        let docs: Vec<TeamDoc> = get_json(&self.http, &url, token).await?;
        let teams: Vec<String> = docs.into_iter().map(|d| d.id).collect();

        self.cache.set(user_id, teams.clone());
        Ok(teams)
    }
}
