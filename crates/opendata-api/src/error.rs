//! Open Data API — HTTP error types.

use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use opendata_auth::error::AuthError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Problem-details body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ProblemBody {
    /// Machine-readable problem type.
    #[serde(rename = "type")]
    pub problem_type: &'static str,
    /// Human-readable summary of the problem type.
    pub title: &'static str,
    /// The HTTP status, repeated in the body.
    pub status: u16,
    /// Human-readable explanation of this occurrence.
    pub detail: String,
}

/// Request-level errors, rendered as problem-details responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is malformed.
    #[error("{0}")]
    Validation(String),

    /// Authentication is missing, wrong or no longer valid.
    #[error("{0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The caller exhausted its per-minute request budget.
    #[error("rate limit of {limit} requests per minute exceeded")]
    RateLimited {
        limit: u32,
        retry_after: i64,
        reset_at: i64,
    },

    /// A data file exists but does not hold valid JSON.
    #[error("{0}")]
    InvalidUpstreamData(String),

    /// Anything that should not leak details to the client.
    #[error("{0}")]
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(message) => Self::Internal(message),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, problem_type, title) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation-error", "Bad Request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not-found", "Not Found"),
            ApiError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate-limit-exceeded",
                "Too Many Requests",
            ),
            ApiError::InvalidUpstreamData(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "invalid-upstream-data",
                "Internal Server Error",
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal-error",
                "Internal Server Error",
            ),
        };

        let body = ProblemBody {
            problem_type,
            title,
            status: status.as_u16(),
            detail: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );

        if let ApiError::RateLimited {
            limit,
            retry_after,
            reset_at,
        } = self
        {
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(limit),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(0u32),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-reset"),
                HeaderValue::from(reset_at),
            );
        }

        response
    }
}
