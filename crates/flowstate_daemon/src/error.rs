//! API error type mapped onto HTTP status codes and JSON bodies.
//!
//! Every strategy failure falls back to the heuristic generator, so the only
//! error a caller can see is a rejected request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flowstate_core::ForecastError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (400)
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    status: &'static str,
    error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Request parsing only raises `InvalidInput`; its message is passed through verbatim.
impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        match e {
            ForecastError::InvalidInput(msg) => Self::BadRequest(msg),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, status = status.as_u16(), "Rejected request");
        let body = ErrorResponse {
            status: "error",
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_becomes_bad_request() {
        let bad = ApiError::from(ForecastError::invalid("Empty history list"));
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.to_string(), "Empty history list");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::bad_request("No JSON data provided").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "error", "error": "No JSON data provided"})
        );
    }
}
