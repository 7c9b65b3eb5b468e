//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::connection::ConnectionState;
use crate::homepage::HomepageData;

/// Response body for `POST /cache/clear`
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub message: String,
}

impl ClearCacheResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Response body for `GET /homepage`
#[derive(Debug, Clone, Serialize)]
pub struct HomepageResponse {
    pub testimonials: Vec<Value>,
    pub faq: Vec<Value>,
    pub course_levels: Vec<Value>,
    pub cached: bool,
    /// Set when the content could not be loaded and empty lists were served
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HomepageResponse {
    /// Empty content with an error note.
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..HomepageData::empty().into()
        }
    }
}

impl From<HomepageData> for HomepageResponse {
    fn from(data: HomepageData) -> Self {
        Self {
            testimonials: data.testimonials,
            faq: data.faq,
            course_levels: data.course_levels,
            cached: data.cached,
            error: None,
        }
    }
}

/// Body of a 429 response
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitedResponse {
    pub error: String,
    /// Seconds until the caller may retry
    pub retry_after: u64,
}

impl RateLimitedResponse {
    pub fn new(retry_after: u64) -> Self {
        Self {
            error: "Rate limit exceeded".to_string(),
            retry_after,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Cache connection state, e.g. "ready" or "disabled"
    pub cache: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// The service stays healthy whatever the cache state is.
    pub fn healthy(cache: ConnectionState) -> Self {
        Self {
            status: "healthy".to_string(),
            cache: cache.as_str().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
