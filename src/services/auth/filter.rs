//! Per-route authorization settings, parsed once from positional filter arguments.
//!
//! The arguments are scanned in two phases:
//! 1. leading arguments starting with `/` are realms (`/employees`, `/services`);
//! 2. everything after the first non-realm argument is a scope (`auth`) or a team (`authTeam`).
//!
//! A single leading empty argument means "no realm" and is consumed, so
//! `"", "read-zmon"` checks the scope regardless of the realm.
//!
//! Empty realm or requirement lists are not constraints: they pass everything.
use std::str::FromStr;

use thiserror::Error;

const REALM_MARKER: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Scope,
    Team,
}

impl CheckKind {
    pub fn filter_name(&self) -> &'static str {
        match self {
            Self::Scope => "auth",
            Self::Team => "authTeam",
        }
    }
}

impl FromStr for CheckKind {
    type Err = FilterConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auth" | "scope" => Ok(Self::Scope),
            "authTeam" | "team" => Ok(Self::Team),
            other => Err(FilterConfigError::UnknownFilter(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterConfigError {
    #[error("unknown auth filter '{0}' (expected 'auth' or 'authTeam')")]
    UnknownFilter(String),
    #[error("empty filter argument at position {0}")]
    EmptyArgument(usize),
    #[error("the team check needs both a team and a service ownership endpoint")]
    MissingTeamServices,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    check: CheckKind,
    realms: Vec<String>,
    requirements: Vec<String>,
}

impl FilterConfig {
    /// Authentication only: any realm, no scope or team requirement.
    pub fn authenticate_only(check: CheckKind) -> Self {
        Self {
            check,
            realms: Vec::new(),
            requirements: Vec::new(),
        }
    }

    pub fn parse<S: AsRef<str>>(check: CheckKind, args: &[S]) -> Result<Self, FilterConfigError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();

        let mut start = 0;
        if args.first().is_some_and(|a| a.is_empty()) {
            start = 1;
        }

        let mut realms = Vec::new();
        let mut pos = start;
        while let Some(arg) = args.get(pos) {
            if !arg.starts_with(REALM_MARKER) {
                break;
            }
            realms.push(arg.to_string());
            pos += 1;
        }

        let mut requirements = Vec::with_capacity(args.len() - pos);
        for (i, arg) in args.iter().enumerate().skip(pos) {
            if arg.is_empty() {
                return Err(FilterConfigError::EmptyArgument(i));
            }
            requirements.push(arg.to_string());
        }

        Ok(Self {
            check,
            realms,
            requirements,
        })
    }

    /// Parses a comma-separated argument list (`/employees,read-zmon,read-stups`).
    pub fn parse_list(check: CheckKind, raw: &str) -> Result<Self, FilterConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::authenticate_only(check));
        }

        let args: Vec<&str> = raw.split(',').map(str::trim).collect();
        Self::parse(check, &args)
    }

    pub fn check(&self) -> CheckKind {
        self.check
    }

    pub fn realms(&self) -> &[String] {
        &self.realms
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn realm_matches(&self, realm: &str) -> bool {
        self.realms.is_empty() || self.realms.iter().any(|r| r == realm)
    }

    /// True when no requirement is configured or one of `granted` is required.
    pub fn requirements_met<I, S>(&self, granted: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.requirements.is_empty() || self.requires_any(granted)
    }

    /// Non-empty intersection test between `granted` and the requirements.
    pub fn requires_any<I, S>(&self, granted: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        granted
            .into_iter()
            .any(|g| self.requirements.iter().any(|r| r == g.as_ref()))
    }
}
