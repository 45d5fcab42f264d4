/*
 * Responsibility
 * - the result of one authorization decision (AuthOutcome / RejectReason)
 * - the per-request state bag the outcome is written into
 *
 * Notes
 * - the bag is shared between the auth layer (writer) and the audit layer (reader)
 * - a OnceLock makes the "written exactly once" rule structural
 */
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    MissingBearerToken,
    AuthServiceAccess,
    InvalidToken,
    InvalidRealm,
    InvalidScope,
    TeamServiceAccess,
    InvalidTeam,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingBearerToken => "missing-bearer-token",
            Self::AuthServiceAccess => "auth-service-access",
            Self::InvalidToken => "invalid-token",
            Self::InvalidRealm => "invalid-realm",
            Self::InvalidScope => "invalid-scope",
            Self::TeamServiceAccess => "team-service-access",
            Self::InvalidTeam => "invalid-team",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized {
        user_id: String,
    },
    /// `user_id` is empty when the request failed before the token was validated.
    Rejected {
        user_id: String,
        reason: RejectReason,
    },
}

impl AuthOutcome {
    pub fn authorized(user_id: impl Into<String>) -> Self {
        Self::Authorized {
            user_id: user_id.into(),
        }
    }

    pub fn rejected(user_id: impl Into<String>, reason: RejectReason) -> Self {
        Self::Rejected {
            user_id: user_id.into(),
            reason,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::Authorized { user_id } | Self::Rejected { user_id, .. } => user_id,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Authorized { .. } => None,
            Self::Rejected { reason, .. } => Some(*reason),
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}

/// Per-request shared state, carried in the request extensions.
///
/// Exposes the `auth-user` and `auth-reject-reason` values read by the audit log.
#[derive(Debug, Clone, Default)]
pub struct StateBag(Arc<OnceLock<AuthOutcome>>);

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome. A second call is refused and hands the value back.
    pub fn record(&self, outcome: AuthOutcome) -> Result<(), AuthOutcome> {
        self.0.set(outcome)
    }

    pub fn outcome(&self) -> Option<&AuthOutcome> {
        self.0.get()
    }

    /// `auth-user`: the validated user id, if any was recorded.
    pub fn auth_user(&self) -> Option<&str> {
        self.outcome()
            .map(AuthOutcome::user_id)
            .filter(|uid| !uid.is_empty())
    }

    /// `auth-reject-reason`
    pub fn reject_reason(&self) -> Option<RejectReason> {
        self.outcome().and_then(AuthOutcome::reject_reason)
    }
}
