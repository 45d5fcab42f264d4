//! Shared JSON-over-HTTP helper for the validation, team and ownership services.
//!
//! Every upstream call is a `GET` carrying the caller's bearer token. The helper keeps
//! transport, status and decode failures apart so callers can classify them.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("upstream response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Build the HTTP client shared by all upstream services.
///
/// `timeout` bounds each call end to end (connect + headers + body).
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// `GET url` with `Authorization: Bearer <token>`, decoding a 200 body as `T`.
///
/// Any status other than 200 is reported as `UpstreamError::Status`.
pub async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    token: &str,
) -> Result<T, UpstreamError> {
    let rsp = http.get(url).bearer_auth(token).send().await?;

    let status = rsp.status();
    if status != StatusCode::OK {
        return Err(UpstreamError::Status(status));
    }

    let body = rsp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Append a user id to an endpoint base URL (`https://teams/api?member=` + `jdoe`).
///
/// The id is form-urlencoded so it cannot escape the position it is appended to.
pub fn append_user_id(base: &str, user_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect();
    format!("{base}{encoded}")
}
