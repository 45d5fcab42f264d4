/*
 * Responsibility
 * - the audit record written once per completed request
 * - the shared NDJSON sink (stdout / stderr / file)
 *
 * Notes
 * - a failed write is logged and dropped; it never affects the response
 * - the sink is shared by all requests, writes are serialized by a mutex
 */
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use serde::Serialize;

use crate::services::auth::outcome::{AuthOutcome, RejectReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutput {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl AuditOutput {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "stderr" => Self::Stderr,
            "stdout" => Self::Stdout,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    pub rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub method: String,
    pub path: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_status: Option<AuthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
}

impl AuditRecord {
    /// `authStatus` is only present when a user or a reject reason is known.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        outcome: Option<&AuthOutcome>,
        body: Option<Bytes>,
    ) -> Self {
        let auth_status = outcome.and_then(|o| {
            let user = o.user_id().to_string();
            let reason = o.reject_reason();
            if user.is_empty() && reason.is_none() {
                return None;
            }
            Some(AuthStatus {
                user,
                rejected: reason.is_some(),
                reason,
            })
        });

        let request_body = body
            .filter(|b| !b.is_empty())
            .map(|b| String::from_utf8_lossy(&b).into_owned());

        Self {
            method: method.into(),
            path: path.into(),
            status,
            auth_status,
            request_body,
        }
    }
}

pub struct AuditLog {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl AuditLog {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Opens the configured output. Files are created if missing and appended to.
    pub fn open(output: &AuditOutput) -> io::Result<Self> {
        let sink: Box<dyn Write + Send> = match output {
            AuditOutput::Stdout => Box::new(io::stdout()),
            AuditOutput::Stderr => Box::new(io::stderr()),
            AuditOutput::File(path) => {
                Box::new(OpenOptions::new().create(true).append(true).open(path)?)
            }
        };
        Ok(Self::new(sink))
    }

    pub fn record(&self, record: &AuditRecord) {
        if let Err(err) = self.write_line(record) {
            tracing::error!(error = %err, "failed to write audit record");
        }
    }

    fn write_line(&self, record: &AuditRecord) -> io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(&line)?;
        sink.flush()
    }
}
