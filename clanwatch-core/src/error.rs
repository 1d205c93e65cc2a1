//! HTTP error type
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}`.

use crate::aggregator::AggregateError;
use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Seconds a client should wait before retrying a timed-out query
pub const RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Aggregation ran out of time (503, retryable)
    #[error("{0}")]
    StillGathering(String),

    /// Upstream could not provide required data (503)
    #[error("{0}")]
    Unavailable(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),
}

impl From<clanwatch_common::Error> for ApiError {
    fn from(err: clanwatch_common::Error) -> Self {
        use clanwatch_common::Error;

        let message = err.to_string();
        match err {
            Error::InvalidTag(_) | Error::InvalidInput(_) => ApiError::BadRequest(message),
            Error::NotFound(_) => ApiError::NotFound(message),
            Error::Io(_) | Error::Config(_) => ApiError::Internal(message),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        let message = err.to_string();
        match err {
            AggregateError::Timeout(_) => ApiError::StillGathering(message),
            AggregateError::ClanNotFound(_)
            | AggregateError::PlayerNotFound(_)
            | AggregateError::PlayerNotInClan(_) => ApiError::NotFound(message),
            AggregateError::InvalidInput(_) => ApiError::BadRequest(message),
            AggregateError::UpstreamUnavailable(_) => ApiError::Unavailable(message),
            AggregateError::Stats(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::StillGathering(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STILL_GATHERING", msg)
            }
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        let mut response = (status, body).into_response();
        if error_code == "STILL_GATHERING" {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
