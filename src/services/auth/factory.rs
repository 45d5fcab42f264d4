//! Factory: build the `Authorizer` from `AuthConfig`.
use std::sync::Arc;

use reqwest::Client;

use crate::config::AuthConfig;
use crate::services::auth::decision::{Authorizer, TeamResolvers};
use crate::services::auth::filter::FilterConfigError;
use crate::services::auth::owner::ServiceOwnershipClient;
use crate::services::auth::team::TeamClient;
use crate::services::auth::validation::ValidationClient;
use crate::services::cache::TeamLookupCache;

pub fn build_authorizer(
    config: &AuthConfig,
    http: Client,
) -> Result<Arc<Authorizer>, FilterConfigError> {
    let validator = Arc::new(ValidationClient::new(
        http.clone(),
        &config.token_validation_url,
    ));

    // One cache per authorizer, shared by all requests it handles.
    let resolvers = config.teams.as_ref().map(|endpoints| {
        let cache = Arc::new(TeamLookupCache::new(config.team_cache_ttl));
        TeamResolvers {
            teams: Arc::new(TeamClient::new(http.clone(), &endpoints.team_url, cache)),
            owners: Arc::new(ServiceOwnershipClient::new(
                http.clone(),
                &endpoints.service_url,
            )),
        }
    });

    let authorizer = Authorizer::new(config.filter.clone(), validator, resolvers)?;
    Ok(Arc::new(authorizer))
}
