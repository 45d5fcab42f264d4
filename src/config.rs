/*
 * Responsibility
 * - read settings from the environment (.env is honoured via dotenvy)
 * - validate them up front: a bad value stops startup, never a request
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::services::audit::AuditOutput;
use crate::services::auth::filter::{CheckKind, FilterConfig, FilterConfigError};
use crate::services::body_tee::TeeLimit;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("invalid auth filter configuration: {0}")]
    Filter(#[from] FilterConfigError),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeamEndpoints {
    pub team_url: String,
    pub service_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub filter: FilterConfig,
    pub token_validation_url: String,
    /// Present iff the filter runs the team check.
    pub teams: Option<TeamEndpoints>,
    pub team_cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct BasicAuthConfig {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub output: AuditOutput,
    pub max_body: TeeLimit,
    /// Read the unconsumed rest of the body (up to `max_body`) after the response.
    pub drain_body: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub backend_url: Url,

    pub auth: Option<AuthConfig>,
    pub basic_auth: Option<BasicAuthConfig>,
    pub audit: Option<AuditConfig>,

    pub upstream_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the environment in production).
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&var, "PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let backend_url = var("BACKEND_URL").ok_or(ConfigError::Missing("BACKEND_URL"))?;
        let backend_url =
            Url::parse(&backend_url).map_err(|e| ConfigError::invalid("BACKEND_URL", e))?;

        let auth = match var("AUTH_FILTER").filter(|s| !s.trim().is_empty()) {
            Some(name) => Some(auth_config(&var, &name)?),
            None => None,
        };

        let basic_auth = var("BASIC_AUTH_USER").map(|user| BasicAuthConfig {
            user,
            password: var("BASIC_AUTH_PASSWORD").unwrap_or_default(),
        });

        let audit = if parse_or(&var, "AUDIT_LOG", true)? {
            let max_body: i64 = parse_or(&var, "AUDIT_LOG_MAX_BODY", 0)?;
            Some(AuditConfig {
                output: AuditOutput::parse(&var("AUDIT_LOG_OUTPUT").unwrap_or_default()),
                max_body: TeeLimit::from_signed(max_body),
                drain_body: parse_or(&var, "AUDIT_LOG_DRAIN_BODY", true)?,
            })
        } else {
            None
        };

        let upstream_timeout = Duration::from_millis(parse_or(&var, "UPSTREAM_TIMEOUT_MS", 5000)?);
        if upstream_timeout.is_zero() {
            return Err(ConfigError::invalid("UPSTREAM_TIMEOUT_MS", "must be > 0"));
        }
        let request_timeout = Duration::from_secs(parse_or(&var, "REQUEST_TIMEOUT_SECONDS", 30)?);

        Ok(Self {
            addr,
            backend_url,
            auth,
            basic_auth,
            audit,
            upstream_timeout,
            request_timeout,
        })
    }
}

fn auth_config<F>(var: &F, name: &str) -> Result<AuthConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let check = CheckKind::from_str(name)?;
    let filter = FilterConfig::parse_list(check, &var("AUTH_ARGS").unwrap_or_default())?;

    let token_validation_url = required_url(var, "TOKEN_VALIDATION_URL")?;

    let teams = match check {
        CheckKind::Scope => None,
        CheckKind::Team => Some(TeamEndpoints {
            team_url: required_url(var, "TEAM_URL")?,
            service_url: required_url(var, "SERVICE_URL")?,
        }),
    };

    let team_cache_ttl = Duration::from_millis(parse_or(var, "TEAM_CACHE_TTL_MS", 1000)?);

    Ok(AuthConfig {
        filter,
        token_validation_url,
        teams,
        team_cache_ttl,
    })
}

// Kept as a string: team and service URLs are prefixes the user id is appended to.
fn required_url<F>(var: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).ok_or(ConfigError::Missing(key))?;
    Url::parse(&raw).map_err(|e| ConfigError::invalid(key, e))?;
    Ok(raw)
}

fn parse_or<F, T>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    match var(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, e)),
        _ => Ok(default),
    }
}
