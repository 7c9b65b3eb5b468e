//! Cache Module
//!
//! Namespaced facades over the shared store. Every facade goes through
//! [`CacheClient`], which owns serialization, statistics and fault handling.

mod client;
pub mod keys;
mod page;
mod session;
mod shop;
mod stats;

// Re-export public types
pub use client::{CacheClient, Degrade};
pub use page::PageCache;
pub use session::SessionCache;
pub use shop::ShopCache;
pub use stats::{CacheStats, StatsSnapshot};
