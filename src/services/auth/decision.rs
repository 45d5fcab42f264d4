//! The authorization decision.
//!
//! Steps, each of which may end the decision:
//! 1. extract the bearer token
//! 2. validate it against the token service
//! 3. check the realm (always before scopes or teams)
//! 4. check scopes, or teams with the service-ownership fallback
//!
//! Every failure ends as `AuthOutcome::Rejected`; nothing is returned as an error.
//! Infrastructure failures are logged here and fail closed.
use std::sync::Arc;

use axum::http::HeaderMap;
use thiserror::Error;

use crate::services::auth::filter::{CheckKind, FilterConfig, FilterConfigError};
use crate::services::auth::outcome::{AuthOutcome, RejectReason};
use crate::services::auth::owner::OwnerSource;
use crate::services::auth::team::TeamSource;
use crate::services::auth::token::extract_bearer;
use crate::services::auth::validation::{TokenValidator, ValidationError};
use crate::services::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("team lookup failed: {0}")]
    TeamService(#[source] UpstreamError),
    #[error("service ownership lookup failed: {0}")]
    OwnerService(#[source] UpstreamError),
}

/// Team membership resolvers used by the `authTeam` check.
#[derive(Clone)]
pub struct TeamResolvers {
    pub teams: Arc<dyn TeamSource>,
    pub owners: Arc<dyn OwnerSource>,
}

#[derive(Clone)]
pub struct Authorizer {
    filter: FilterConfig,
    validator: Arc<dyn TokenValidator>,
    resolvers: Option<TeamResolvers>,
}

impl Authorizer {
    /// Fails when a team check is configured without team resolvers.
    pub fn new(
        filter: FilterConfig,
        validator: Arc<dyn TokenValidator>,
        resolvers: Option<TeamResolvers>,
    ) -> Result<Self, FilterConfigError> {
        if filter.check() == CheckKind::Team && resolvers.is_none() {
            return Err(FilterConfigError::MissingTeamServices);
        }

        Ok(Self {
            filter,
            validator,
            resolvers,
        })
    }

    pub async fn decide(&self, headers: &HeaderMap) -> AuthOutcome {
        let token = match extract_bearer(headers) {
            Ok(token) => token,
            Err(reason) => return AuthOutcome::rejected("", reason),
        };

        let identity = match self.validator.validate(token).await {
            Ok(identity) => identity,
            Err(ValidationError::InvalidToken) => {
                return AuthOutcome::rejected("", RejectReason::InvalidToken);
            }
            Err(err) => {
                tracing::warn!(error = %err, "token validation failed");
                return AuthOutcome::rejected("", RejectReason::AuthServiceAccess);
            }
        };

        let uid = identity.user_id;

        if !self.filter.realm_matches(&identity.realm) {
            return AuthOutcome::rejected(uid, RejectReason::InvalidRealm);
        }

        match self.filter.check() {
            CheckKind::Scope => {
                if self.filter.requirements_met(&identity.scopes) {
                    AuthOutcome::authorized(uid)
                } else {
                    AuthOutcome::rejected(uid, RejectReason::InvalidScope)
                }
            }
            CheckKind::Team => match self.check_team(&uid, token).await {
                Ok(true) => AuthOutcome::authorized(uid),
                Ok(false) => AuthOutcome::rejected(uid, RejectReason::InvalidTeam),
                Err(err) => {
                    tracing::warn!(error = %err, user_id = %uid, "team resolution failed");
                    AuthOutcome::rejected(uid, RejectReason::TeamServiceAccess)
                }
            },
        }
    }

    async fn check_team(&self, uid: &str, token: &str) -> Result<bool, AuthError> {
        if self.filter.requirements().is_empty() {
            return Ok(true);
        }

        // `new` guarantees resolvers for the team check
        let Some(resolvers) = &self.resolvers else {
            return Ok(false);
        };

        let teams = resolvers
            .teams
            .teams(uid, token)
            .await
            .map_err(AuthError::TeamService)?;
        if self.filter.requires_any(&teams) {
            return Ok(true);
        }

        tracing::debug!(user_id = %uid, "no matching team, trying service ownership");
        let owner = resolvers
            .owners
            .owner(uid, token)
            .await
            .map_err(AuthError::OwnerService)?;

        Ok(self.filter.requires_any([owner]))
    }
}
