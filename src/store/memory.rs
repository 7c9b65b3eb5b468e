//! Memory Store Module
//!
//! In-process key-value table with per-key expiry and LRU eviction, exposing
//! the same command surface as the Redis backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{CacheError, Result};
use crate::store::glob_match;

// == Stored Value ==
/// A single value with its optional deadline.
#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: String, ttl_seconds: Option<u64>) -> Self {
        Self {
            value,
            expires_at: ttl_seconds.map(|ttl| Instant::now() + Duration::from_secs(ttl)),
        }
    }

    /// Expired once the deadline is reached, not after.
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

// == Memory Table ==
#[derive(Debug)]
struct MemoryTable {
    entries: HashMap<String, StoredValue>,
    /// Front = most recently used, back = next eviction candidate
    recency: VecDeque<String>,
    max_entries: usize,
}

impl MemoryTable {
    fn touch(&mut self, key: &str) {
        self.forget(key);
        self.recency.push_front(key.to_string());
    }

    fn forget(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
    }

    fn remove(&mut self, key: &str) -> bool {
        self.forget(key);
        self.entries.remove(key).is_some()
    }

    /// Returns the live entry, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut StoredValue> {
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn insert(&mut self, key: &str, value: StoredValue) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.recency.pop_back() {
                self.entries.remove(&evicted);
            }
        }
        self.entries.insert(key.to_string(), value);
        self.touch(key);
    }
}

// == Memory Store ==
/// Clonable handle to a shared in-memory table.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    table: Arc<RwLock<MemoryTable>>,
}

impl MemoryStore {
    /// Creates an empty store holding at most `max_entries` keys.
    pub fn new(max_entries: usize) -> Self {
        Self {
            table: Arc::new(RwLock::new(MemoryTable {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                max_entries: max_entries.max(1),
            })),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut table = self.table.write().await;
        let value = table.live(key, Instant::now()).map(|e| e.value.clone());
        if value.is_some() {
            table.touch(key);
        }
        Ok(value)
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        if ttl_seconds == 0 {
            return Err(CacheError::Store(
                "invalid expire time in 'set' command".to_string(),
            ));
        }
        let mut table = self.table.write().await;
        table.insert(key, StoredValue::new(value.to_string(), Some(ttl_seconds)));
        Ok(())
    }

    pub async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut table = self.table.write().await;
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            if table.live(key, now).is_some() && table.remove(key) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Keeps any existing expiry; a fresh key has none, as in Redis.
    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut table = self.table.write().await;
        match table.live(key, Instant::now()) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| {
                    CacheError::Store("value is not an integer or out of range".to_string())
                })?;
                let next = current.checked_add(1).ok_or_else(|| {
                    CacheError::Store("increment or decrement would overflow".to_string())
                })?;
                entry.value = next.to_string();
                table.touch(key);
                Ok(next)
            }
            None => {
                table.insert(key, StoredValue::new("1".to_string(), None));
                Ok(1)
            }
        }
    }

    pub async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        let mut table = self.table.write().await;
        let now = Instant::now();
        if seconds == 0 {
            return Ok(table.live(key, now).is_some() && table.remove(key));
        }
        match table.live(key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + Duration::from_secs(seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let table = self.table.read().await;
        let now = Instant::now();
        let mut keys: Vec<String> = table
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    // == Purge Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut table = self.table.write().await;
        let now = Instant::now();
        let expired: Vec<String> = table
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            table.remove(key);
        }
        expired.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.table.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
