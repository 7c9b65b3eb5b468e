//! API Handlers
//!
//! HTTP request handlers for each endpoint of the cache service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{error, warn};

use crate::cache::{CacheClient, CacheStats, PageCache, SessionCache, ShopCache, StatsSnapshot};
use crate::config::{BackendKind, Config};
use crate::connection::ConnectionManager;
use crate::error::{CacheError, Result};
use crate::homepage::{ContentSource, EmptySource, HomepageLoader, RestContentSource};
use crate::invalidation::CacheInvalidator;
use crate::models::{
    ClearCacheRequest, ClearCacheResponse, ErrorResponse, HealthResponse, HomepageResponse,
    RateLimitedResponse,
};
use crate::rate_limit::RateLimiter;
use crate::store::{MemoryStore, StoreBackend};

/// Application state shared across all handlers.
///
/// Every facade holds a clone of the same [`CacheClient`], so they share
/// one connection and one set of counters.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionManager>,
    pub stats: Arc<CacheStats>,
    pub shop: ShopCache,
    pub page: PageCache,
    pub sessions: SessionCache,
    pub rate_limiter: RateLimiter,
    pub invalidator: CacheInvalidator,
    pub homepage: HomepageLoader,
}

impl AppState {
    /// Wires the facades over an existing connection manager.
    pub fn new(
        connections: Arc<ConnectionManager>,
        config: &Config,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        let stats = Arc::new(CacheStats::new());
        let client = CacheClient::new(connections.clone(), stats.clone());

        let shop = ShopCache::new(client.clone(), config.ttl.clone());
        let page = PageCache::new(client.clone(), config.ttl.clone());
        let sessions = SessionCache::new(client.clone(), &config.ttl);
        let rate_limiter = RateLimiter::new(client, config.rate_limit.clone());
        let invalidator = CacheInvalidator::new(shop.clone(), page.clone());
        let homepage = HomepageLoader::new(page.clone(), source, config.content.testimonial_limit);

        Self {
            connections,
            stats,
            shop,
            page,
            sessions,
            rate_limiter,
            invalidator,
            homepage,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// A Redis connection is not opened here; the first cache call opens it.
    /// The in-memory backend is created up front so its purge task can be
    /// attached to it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let connection = &config.connection;
        let in_memory = connection.backend == BackendKind::Memory && !connection.is_disabled();
        let connections = if in_memory {
            let store = StoreBackend::Memory(MemoryStore::new(connection.memory_max_entries));
            ConnectionManager::with_backend(connection.clone(), store)
        } else {
            ConnectionManager::new(connection.clone())
        };
        let connections = Arc::new(connections);
        let rest_source = RestContentSource::from_config(&config.content)?;
        let source: Arc<dyn ContentSource> = match rest_source {
            Some(source) => Arc::new(source),
            None => {
                warn!("CONTENT_API_URL not set, homepage content will be empty");
                Arc::new(EmptySource)
            }
        };
        Ok(Self::new(connections, config, source))
    }
}

/// Handler for POST /cache/clear
///
/// Clears one cache domain, optionally together with one user's entries.
/// Any body that is not a JSON object is rejected with a JSON 400.
pub async fn clear_cache_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<ClearCacheRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(
                status = %rejection.status(),
                reason = %rejection.body_text(),
                "Rejected cache clear body"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Invalid request body")),
            )
                .into_response();
        }
    };

    let kind = match req.kind() {
        Ok(kind) => kind,
        Err(e) => return e.into_response(),
    };

    match state.invalidator.clear(kind, req.user_id.as_deref()).await {
        Ok(message) => Json(ClearCacheResponse::new(message)).into_response(),
        Err(e @ CacheError::InvalidRequest(_)) => e.into_response(),
        Err(e) => {
            error!(error = %e, "Error clearing cache");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_details("Failed to clear cache", e.to_string())),
            )
                .into_response()
        }
    }
}

/// Handler for GET /homepage
///
/// Rate-limits the caller by IP, then serves the homepage content through
/// the read-through loader.
pub async fn homepage_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let decision = state.rate_limiter.check(&format!("homepage:{}", ip)).await;

    if !decision.allowed {
        let retry_after = retry_after_secs(decision.reset_time, Utc::now().timestamp_millis());
        warn!(ip = %ip, count = decision.count, "Homepage rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(RateLimitedResponse::new(retry_after)),
        )
            .into_response();
    }

    match state.homepage.load().await {
        Ok(data) => Json(HomepageResponse::from(data)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to load homepage content");
            Json(HomepageResponse::fallback("Failed to load data")).into_response()
        }
    }
}

/// Handler for GET /cache/stats
///
/// Returns hit, miss, write and error counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Handler for GET /health
///
/// Returns health status of the service and the cache connection state.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.connections.state()))
}

/// First `X-Forwarded-For` entry, else `X-Real-IP`, else the peer address.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or_default().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Whole seconds until `reset_time_ms`, rounded up.
fn retry_after_secs(reset_time_ms: i64, now_ms: i64) -> u64 {
    let remaining_ms = reset_time_ms.saturating_sub(now_ms).max(0);
    u64::try_from(remaining_ms.saturating_add(999) / 1000).unwrap_or(0)
}
