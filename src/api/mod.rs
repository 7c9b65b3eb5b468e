//! API Module
//!
//! HTTP handlers and routing for the cache service REST API.
//!
//! # Endpoints
//! - `POST /cache/clear` - Clear shop, homepage, user or all cache data
//! - `GET /homepage` - Homepage content, rate-limited per client IP
//! - `GET /cache/stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
