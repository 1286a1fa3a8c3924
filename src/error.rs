use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure of a single provider call
///
/// None of these reach the resolver's caller; the resolver logs them and moves on.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Provider has no data for the title; the resolver treats this as an empty result
    #[error("Title not found")]
    NotFound,

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Unsupported query: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AdapterError::Malformed(e.to_string())
        } else {
            AdapterError::Transient(e.to_string())
        }
    }
}

/// Caller errors from the resolver. Missing availability is never an error.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Cache backend failures, absorbed by the cache front
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        AppError::InvalidInput(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_maps_to_bad_request() {
        let err: AppError = ResolveError::InvalidQuery("external_id must be positive".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_adapter_error_display() {
        assert_eq!(
            AdapterError::RateLimited(60).to_string(),
            "Rate limited, retry after 60s"
        );
    }
}
