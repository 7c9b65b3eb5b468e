//! Error types for the cache service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache service.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store unreachable, refused, timed out or failed its liveness probe
    #[error("Connection error: {0}")]
    Connection(String),

    /// Store settings are unusable, e.g. a malformed URL; never retried
    #[error("Configuration error: {0}")]
    Config(String),

    /// A command against a connected store failed
    #[error("Store error: {0}")]
    Store(String),

    /// Cached payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Content source fetch failed
    #[error("Source error: {0}")]
    Source(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Store(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Source(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            CacheError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Internal server error",
                    "details": other.to_string()
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl CacheError {
    /// Whether another connect attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CacheError::Config(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache service.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_is_bad_request() {
        let response = CacheError::InvalidRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_is_internal() {
        let response = CacheError::Store("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(CacheError::from(err), CacheError::Serialization(_)));
    }

    #[test]
    fn test_only_config_errors_are_final() {
        assert!(!CacheError::Config("bad url".to_string()).is_retryable());
        assert!(CacheError::Connection("refused".to_string()).is_retryable());
    }
}
