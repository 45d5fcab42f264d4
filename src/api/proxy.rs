/*
 * Responsibility
 * - forward every request that made it through the pipeline to the backend
 * - stream bodies both ways (the request body may be the audit tee)
 * - strip hop-by-hop headers in both directions
 */
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Uri, header},
    response::Response,
};
use url::Url;

use crate::error::AppError;
use crate::state::AppState;

const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

pub async fn forward(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();
    let url = target_url(&state.backend, &parts.uri);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    let upstream = state
        .http
        .request(parts.method, url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "backend request failed");
            AppError::from(err)
        })?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Backend base URL + request path and query. The backend's own path is kept as a prefix.
fn target_url(backend: &Url, uri: &Uri) -> Url {
    let mut url = backend.clone();
    let base = backend.path().trim_end_matches('/');
    url.set_path(&format!("{base}{}", uri.path()));
    url.set_query(uri.query());
    url
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}
