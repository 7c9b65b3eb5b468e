//! Halaqah Cache - caching and rate limiting for the Halaqah learning platform
//!
//! Namespaced Redis caches for the shop, homepage and sessions, a
//! fixed-window rate limiter and the operator cache-clearing endpoint.
//! Caching is an accelerator only: an unavailable store degrades every
//! read to a miss and every write to a no-op.

pub mod api;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod homepage;
pub mod invalidation;
pub mod models;
pub mod rate_limit;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{CacheError, Result};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use tasks::spawn_cleanup_task;
