/*
 * Responsibility
 * - the AppError returned by middleware and the proxy handler
 * - IntoResponse: 401 without a body, other errors as a JSON error body
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad gateway: {0}")]
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            // The rejection carries no body, whatever the reason.
            AppError::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            AppError::BadGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "backend unavailable".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::BadGateway(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn unauthorized_has_empty_body() {
        let rsp = AppError::Unauthorized.into_response();
        assert_eq!(rsp.status(), StatusCode::UNAUTHORIZED);

        let body = rsp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn bad_gateway_hides_cause() {
        let rsp = AppError::BadGateway("connection refused".into()).into_response();
        assert_eq!(rsp.status(), StatusCode::BAD_GATEWAY);

        let body = rsp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "BAD_GATEWAY");
        assert!(!json["error"]["message"].as_str().unwrap().contains("refused"));
    }
}
