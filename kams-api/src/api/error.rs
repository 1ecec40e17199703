//! Error responses
//!
//! Every failure is rendered as `{"status": "error", "message": ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// API errors
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<kams_common::Error> for ApiError {
    fn from(err: kams_common::Error) -> Self {
        match err {
            kams_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            kams_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Parse an employee id path segment
pub fn parse_nik(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid nik: {}", raw)))
}

/// Quarter path segments arrive percent-decoded; surrounding spaces are dropped
pub fn clean_quarter(raw: &str) -> String {
    raw.trim().to_string()
}
