//! Shared cache client and the fault guard every facade goes through.
//!
//! One wrapper decides what a fault becomes, instead of each facade method
//! catching errors itself:
//!
//! | `Degrade`  | store absent | connection fault (Throw) | command error |
//! |------------|--------------|--------------------------|---------------|
//! | `Fallback` | fallback     | `Err`                    | fallback      |
//! | `FailOpen` | fallback     | fallback                 | fallback      |
//! | `Rethrow`  | fallback     | `Err`                    | `Err`         |
//!
//! The fallback is `None` for reads and `()` for writes and clears.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::stats::CacheStats;
use crate::connection::ConnectionManager;
use crate::error::{CacheError, Result};
use crate::store::StoreBackend;

// == Degrade Mode ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degrade {
    /// Command errors become the fallback; connection faults follow the fault policy.
    Fallback,
    /// Every fault becomes the fallback.
    FailOpen,
    /// Only an absent store becomes the fallback.
    Rethrow,
}

// == Cache Client ==
#[derive(Debug, Clone)]
pub struct CacheClient {
    connections: Arc<ConnectionManager>,
    stats: Arc<CacheStats>,
}

impl CacheClient {
    pub fn new(connections: Arc<ConnectionManager>, stats: Arc<CacheStats>) -> Self {
        Self { connections, stats }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }

    /// Runs `op` against the shared store under the given degrade mode.
    pub async fn guard<T, F, Fut>(
        &self,
        op: &'static str,
        degrade: Degrade,
        fallback: T,
        run: F,
    ) -> Result<T>
    where
        F: FnOnce(StoreBackend) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let store = match self.connections.connection().await {
            Ok(Some(store)) => store,
            Ok(None) => {
                debug!(op, "Cache store not available, skipping");
                return Ok(fallback);
            }
            Err(e) => {
                self.stats.record_error();
                if degrade == Degrade::FailOpen {
                    self.log_fault(op, &e);
                    return Ok(fallback);
                }
                return Err(e);
            }
        };

        match run(store).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.stats.record_error();
                if degrade == Degrade::Rethrow {
                    return Err(e);
                }
                self.log_fault(op, &e);
                Ok(fallback)
            }
        }
    }

    // == JSON Helpers ==
    /// Reads and deserializes `key`; absent or malformed payloads are a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: String) -> Result<Option<T>> {
        let lookup = key.clone();
        let value = self
            .guard("get", Degrade::Fallback, None, |store| async move {
                let Some(raw) = store.get(&lookup).await? else {
                    return Ok(None);
                };
                match serde_json::from_str::<T>(&raw) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) => {
                        warn!(key = %lookup, error = %e, "Discarding unreadable cache payload");
                        Ok(None)
                    }
                }
            })
            .await?;

        if value.is_some() {
            debug!(key = %key, "Cache HIT");
            self.stats.record_hit();
        } else {
            debug!(key = %key, "Cache MISS");
            self.stats.record_miss();
        }
        Ok(value)
    }

    /// Serializes the full value and writes it with a TTL of at least one second.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: String,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<()> {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.record_error();
                self.log_fault("set", &CacheError::from(e));
                return Ok(());
            }
        };

        let stats = self.stats.clone();
        let ttl = ttl_seconds.max(1);
        self.guard("set", Degrade::Fallback, (), |store| async move {
            store.set_ex(&key, &payload, ttl).await?;
            stats.record_write();
            debug!(key = %key, ttl_seconds = ttl, "Cache SET");
            Ok(())
        })
        .await
    }

    /// Deletes the listed keys in one batch.
    pub async fn delete_keys(&self, keys: Vec<String>, degrade: Degrade) -> Result<u64> {
        self.guard("delete", degrade, 0, |store| async move {
            let removed = store.del(&keys).await?;
            debug!(keys = ?keys, removed, "Cache DEL");
            Ok(removed)
        })
        .await
    }

    /// Deletes every key matching `pattern` plus `extra`, in one batch.
    pub async fn delete_pattern(
        &self,
        pattern: String,
        extra: Vec<String>,
        degrade: Degrade,
    ) -> Result<u64> {
        self.guard("delete_pattern", degrade, 0, |store| async move {
            let mut keys = store.keys(&pattern).await?;
            keys.extend(extra);
            let removed = store.del(&keys).await?;
            debug!(pattern = %pattern, removed, "Cache pattern DEL");
            Ok(removed)
        })
        .await
    }

    fn log_fault(&self, op: &str, error: &CacheError) {
        if self.connections.config().quiet_faults() {
            debug!(op, error = %error, "Cache operation failed");
        } else {
            warn!(op, error = %error, "Cache operation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, FaultPolicy};
    use crate::store::MemoryStore;

    fn memory_client() -> CacheClient {
        let store = StoreBackend::Memory(MemoryStore::new(100));
        let connections = ConnectionManager::with_backend(ConnectionConfig::default(), store);
        CacheClient::new(Arc::new(connections), Arc::new(CacheStats::new()))
    }

    fn failing_client(policy: FaultPolicy) -> CacheClient {
        let config = ConnectionConfig {
            redis_url: "not a redis url".to_string(),
            fault_policy: policy,
            max_retries: 0,
            ..ConnectionConfig::default()
        };
        CacheClient::new(
            Arc::new(ConnectionManager::new(config)),
            Arc::new(CacheStats::new()),
        )
    }

    #[tokio::test]
    async fn test_json_round_trip_counts_hit() {
        let client = memory_client();
        client
            .set_json("homepage:faq".to_string(), &vec!["q1", "q2"], 60)
            .await
            .unwrap();

        let value: Option<Vec<String>> = client.get_json("homepage:faq".to_string()).await.unwrap();
        assert_eq!(value, Some(vec!["q1".to_string(), "q2".to_string()]));

        let snapshot = client.stats().snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.writes, 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_miss() {
        let client = memory_client();
        let store = client.connections().connection().await.unwrap().unwrap();
        store.set_ex("homepage:faq", "{not json", 60).await.unwrap();

        let value: Option<Vec<String>> = client.get_json("homepage:faq".to_string()).await.unwrap();
        assert!(value.is_none());
        assert_eq!(client.stats().snapshot().misses, 1);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_miss() {
        let client = memory_client();
        client.set_json("k".to_string(), "text", 60).await.unwrap();

        let value: Option<u32> = client.get_json("k".to_string()).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_fallback_swallows_command_errors() {
        let client = memory_client();
        let value = client
            .guard("op", Degrade::Fallback, 7u32, |_| async {
                Err::<u32, _>(CacheError::Store("boom".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(client.stats().snapshot().errors, 1);
    }

    #[tokio::test]
    async fn test_rethrow_surfaces_command_errors() {
        let client = memory_client();
        let result = client
            .guard("op", Degrade::Rethrow, (), |_| async {
                Err::<(), _>(CacheError::Store("boom".to_string()))
            })
            .await;
        assert!(matches!(result, Err(CacheError::Store(_))));
    }

    #[tokio::test]
    async fn test_connection_fault_follows_policy() {
        let throwing = failing_client(FaultPolicy::Throw);
        let result: Result<Option<String>> = throwing.get_json("k".to_string()).await;
        assert!(matches!(result, Err(CacheError::Connection(_))));

        // FailOpen ignores the policy
        let value = throwing
            .guard("op", Degrade::FailOpen, 1u8, |_| async { Ok(2u8) })
            .await
            .unwrap();
        assert_eq!(value, 1);

        let swallowing = failing_client(FaultPolicy::Swallow);
        let value: Option<String> = swallowing.get_json("k".to_string()).await.unwrap();
        assert!(value.is_none());
        swallowing.set_json("k".to_string(), "v", 60).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_pattern_with_extra_keys() {
        let client = memory_client();
        for key in ["shop_items:a", "shop_items:b", "flash_sale:current", "homepage:faq"] {
            client.set_json(key.to_string(), &1, 60).await.unwrap();
        }

        let removed = client
            .delete_pattern(
                "shop_items:*".to_string(),
                vec!["flash_sale:current".to_string()],
                Degrade::Fallback,
            )
            .await
            .unwrap();
        assert_eq!(removed, 3);

        let kept: Option<i32> = client.get_json("homepage:faq".to_string()).await.unwrap();
        assert_eq!(kept, Some(1));
    }
}
