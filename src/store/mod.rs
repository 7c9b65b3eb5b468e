//! Store Module
//!
//! Key-value backends behind a single enum so the connection manager can hand
//! out one cheap, clonable handle regardless of where the data lives.
//!
//! ```text
//! StoreBackend (enum)
//!   ├── Redis(RedisStore)    <- multiplexed ConnectionManager
//!   └── Memory(MemoryStore)  <- in-process TTL table
//! ```
//!
//! Only the commands the cache layer needs are exposed: GET, SET EX, DEL,
//! INCR, EXPIRE, KEYS and PING.

mod memory;
mod redis_store;

#[cfg(test)]
mod property_tests;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::error::Result;

// == Store Backend ==
/// A connected key-value store.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl StoreBackend {
    /// GET: the raw string under `key`, if present.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Redis(s) => s.get(key).await,
            Self::Memory(s) => s.get(key).await,
        }
    }

    /// SET with EX: overwrites `key` and resets its expiry.
    pub async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        match self {
            Self::Redis(s) => s.set_ex(key, value, ttl_seconds).await,
            Self::Memory(s) => s.set_ex(key, value, ttl_seconds).await,
        }
    }

    /// DEL: removes every listed key in one batch, returns how many existed.
    pub async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        match self {
            Self::Redis(s) => s.del(keys).await,
            Self::Memory(s) => s.del(keys).await,
        }
    }

    /// INCR: creates the key at 1 when absent.
    pub async fn incr(&self, key: &str) -> Result<i64> {
        match self {
            Self::Redis(s) => s.incr(key).await,
            Self::Memory(s) => s.incr(key).await,
        }
    }

    /// EXPIRE: returns false when the key does not exist.
    pub async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        match self {
            Self::Redis(s) => s.expire(key, seconds).await,
            Self::Memory(s) => s.expire(key, seconds).await,
        }
    }

    /// KEYS: every live key matching a glob pattern (`*`, `?`).
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        match self {
            Self::Redis(s) => s.keys(pattern).await,
            Self::Memory(s) => s.keys(pattern).await,
        }
    }

    /// PING liveness probe.
    pub async fn ping(&self) -> Result<()> {
        match self {
            Self::Redis(s) => s.ping().await,
            Self::Memory(_) => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

// == Glob Matching ==
/// Matches `key` against a Redis-style glob supporting `*` and `?`.
///
/// Used by the memory backend for KEYS; Redis evaluates patterns itself.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    // Position of the last `*` seen and the key index it was matched against
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == key[k]) {
            p += 1;
            k += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, k));
            p += 1;
        } else if let Some((star_p, star_k)) = star {
            // Let the last star swallow one more character and retry
            p = star_p + 1;
            k = star_k + 1;
            star = Some((star_p, star_k + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_prefix_star() {
        assert!(glob_match("shop_items:*", "shop_items:badge"));
        assert!(glob_match("shop_items:*", "shop_items:"));
        assert!(!glob_match("shop_items:*", "user_inventory:u1"));
        assert!(!glob_match("shop_items:*", "shop_item"));
    }

    #[test]
    fn test_glob_question_mark_and_inner_star() {
        assert!(glob_match("session:?", "session:a"));
        assert!(!glob_match("session:?", "session:ab"));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(!glob_match("a*c*e", "abcdf"));
    }

    #[test]
    fn test_glob_exact() {
        assert!(glob_match("flash_sale:current", "flash_sale:current"));
        assert!(!glob_match("flash_sale:current", "flash_sale:next"));
    }

    #[tokio::test]
    async fn test_backend_del_empty_is_noop() {
        let store = StoreBackend::Memory(MemoryStore::new(10));
        assert_eq!(store.del(&[]).await.unwrap(), 0);
        assert_eq!(store.name(), "memory");
        assert!(store.ping().await.is_ok());
    }
}
