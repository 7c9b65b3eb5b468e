//! Connection Manager
//!
//! Lazily builds one key-value store handle per manager and shares it with
//! every facade and the rate limiter.
//!
//! The initialization future itself is memoized in a `tokio::sync::OnceCell`:
//! concurrent first callers all await the same attempt, so two connections
//! can never be created by racing callers. The outcome (ready or
//! unavailable) stays cached until [`ConnectionManager::reset`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::{BackendKind, ConnectionConfig, FaultPolicy};
use crate::error::{CacheError, Result};
use crate::store::{MemoryStore, RedisStore, StoreBackend};

// == Connection State ==
/// Lifecycle of the shared connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Ready,
    Unavailable,
    /// Switched off by configuration; no connection is ever attempted.
    Disabled,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Unavailable => "unavailable",
            ConnectionState::Disabled => "disabled",
        }
    }
}

/// Memoized result of one initialization attempt.
#[derive(Debug)]
enum Outcome {
    Ready(StoreBackend),
    Unavailable(String),
}

// == Connection Manager ==
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    cell: ArcSwap<OnceCell<Outcome>>,
    connecting: AtomicBool,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            cell: ArcSwap::from_pointee(OnceCell::new()),
            connecting: AtomicBool::new(false),
        }
    }

    /// A manager that is ready immediately with the given backend.
    ///
    /// Used to share one in-memory store between the service and its tests.
    pub fn with_backend(config: ConnectionConfig, backend: StoreBackend) -> Self {
        let manager = Self::new(config);
        let cell = OnceCell::new();
        // A fresh cell cannot already be set
        let _ = cell.set(Outcome::Ready(backend));
        manager.cell.store(Arc::new(cell));
        manager
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The in-memory backend, once it is the ready store.
    pub fn memory_store(&self) -> Option<MemoryStore> {
        match self.cell.load().get() {
            Some(Outcome::Ready(StoreBackend::Memory(store))) => Some(store.clone()),
            _ => None,
        }
    }

    /// Returns the shared store, `None` when caching is absent.
    ///
    /// Under [`FaultPolicy::Throw`] a failed initialization is returned as
    /// [`CacheError::Connection`] instead of `None`.
    pub async fn connection(&self) -> Result<Option<StoreBackend>> {
        if self.config.is_disabled() {
            return Ok(None);
        }

        let cell = self.cell.load_full();
        let outcome = cell.get_or_init(|| self.initialize()).await;

        match outcome {
            Outcome::Ready(store) => Ok(Some(store.clone())),
            Outcome::Unavailable(reason) => match self.config.fault_policy {
                FaultPolicy::Swallow => Ok(None),
                FaultPolicy::Throw => Err(CacheError::Connection(reason.clone())),
            },
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.config.is_disabled() {
            return ConnectionState::Disabled;
        }
        match self.cell.load().get() {
            Some(Outcome::Ready(_)) => ConnectionState::Ready,
            Some(Outcome::Unavailable(_)) => ConnectionState::Unavailable,
            None if self.connecting.load(Ordering::Acquire) => ConnectionState::Connecting,
            None => ConnectionState::Uninitialized,
        }
    }

    /// Forgets the memoized outcome; the next call connects again.
    pub fn reset(&self) {
        self.cell.store(Arc::new(OnceCell::new()));
        info!("Cache connection reset");
    }

    async fn initialize(&self) -> Outcome {
        self.settle(self.establish()).await
    }

    /// Drives one initialization attempt to an [`Outcome`].
    ///
    /// `connecting` is raised for as long as the attempt is alive, and is
    /// lowered even when the awaiting caller is cancelled.
    async fn settle<F>(&self, attempt: F) -> Outcome
    where
        F: Future<Output = Result<StoreBackend>>,
    {
        let _connecting = ConnectingFlag::raise(&self.connecting);
        match attempt.await {
            Ok(store) => {
                info!(backend = store.name(), "Cache store ready");
                Outcome::Ready(store)
            }
            Err(e) => {
                self.log_fault("Cache store unavailable, continuing without cache", &e);
                Outcome::Unavailable(e.to_string())
            }
        }
    }

    async fn establish(&self) -> Result<StoreBackend> {
        if self.config.backend == BackendKind::Memory {
            return Ok(StoreBackend::Memory(MemoryStore::new(
                self.config.memory_max_entries,
            )));
        }

        let config = &self.config;
        self.connect_with_retry(|| async move {
            let redis = RedisStore::connect(&config.redis_url, config.connect_timeout, 0).await?;
            let store = StoreBackend::Redis(redis);
            store.ping().await?;
            Ok(store)
        })
        .await
    }

    /// Runs `connect` until it succeeds, retrying with linear backoff up to
    /// `max_retries` times. Configuration errors are returned at once.
    async fn connect_with_retry<F, Fut>(&self, mut connect: F) -> Result<StoreBackend>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<StoreBackend>>,
    {
        let mut attempt: u32 = 0;
        loop {
            info!(attempt = attempt + 1, "Connecting to Redis");
            match connect().await {
                Ok(store) => {
                    info!("Redis connection test successful");
                    return Ok(store);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.backoff_for(attempt);
                    self.log_fault("Redis connect failed, retrying", &e);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "Redis reconnect backoff");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        retries = self.config.max_retries,
                        "Redis reconnection failed, giving up"
                    );
                    return Err(e);
                }
            }
        }
    }

    fn log_fault(&self, message: &str, error: &CacheError) {
        if self.config.quiet_faults() {
            debug!(error = %error, "{}", message);
        } else {
            warn!(error = %error, "{}", message);
        }
    }
}

/// Holds `connecting` high until dropped.
struct ConnectingFlag<'a>(&'a AtomicBool);

impl<'a> ConnectingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for ConnectingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    fn failing_config(policy: FaultPolicy) -> ConnectionConfig {
        ConnectionConfig {
            redis_url: "not a redis url".to_string(),
            fault_policy: policy,
            max_retries: 2,
            backoff_step: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(2),
            ..ConnectionConfig::default()
        }
    }

    fn memory_config() -> ConnectionConfig {
        ConnectionConfig {
            backend: BackendKind::Memory,
            ..ConnectionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_returns_none_without_connecting() {
        let config = ConnectionConfig {
            disabled: true,
            ..failing_config(FaultPolicy::Throw)
        };
        let manager = ConnectionManager::new(config);

        assert!(manager.connection().await.unwrap().is_none());
        assert_eq!(manager.state(), ConnectionState::Disabled);
    }

    #[tokio::test]
    async fn test_swallow_policy_degrades_to_none() {
        let manager = ConnectionManager::new(failing_config(FaultPolicy::Swallow));
        assert_eq!(manager.state(), ConnectionState::Uninitialized);

        assert!(manager.connection().await.unwrap().is_none());
        assert_eq!(manager.state(), ConnectionState::Unavailable);
    }

    #[tokio::test]
    async fn test_throw_policy_propagates_and_stays_unavailable() {
        let manager = ConnectionManager::new(failing_config(FaultPolicy::Throw));

        let first = manager.connection().await;
        assert!(matches!(first, Err(CacheError::Connection(_))));

        // Terminal until reset: the same fault is reported again
        let second = manager.connection().await;
        assert!(matches!(second, Err(CacheError::Connection(_))));
        assert_eq!(manager.state(), ConnectionState::Unavailable);
    }

    #[tokio::test]
    async fn test_memory_backend_is_memoized() {
        let manager = ConnectionManager::new(memory_config());

        let first = manager.connection().await.unwrap().unwrap();
        first.set_ex("k", "v", 60).await.unwrap();

        // Same underlying table on every call
        let second = manager.connection().await.unwrap().unwrap();
        assert_eq!(second.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(manager.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_connection() {
        let manager = Arc::new(ConnectionManager::new(memory_config()));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let manager = manager.clone();
                tokio::spawn(async move {
                    let store = manager.connection().await.unwrap().unwrap();
                    store.incr("shared").await.unwrap();
                    i
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // Sixteen increments landed in a single store
        let store = manager.connection().await.unwrap().unwrap();
        assert_eq!(store.get("shared").await.unwrap().as_deref(), Some("16"));
    }

    #[tokio::test]
    async fn test_reset_reconnects() {
        let manager = ConnectionManager::new(memory_config());
        let store = manager.connection().await.unwrap().unwrap();
        store.set_ex("k", "v", 60).await.unwrap();

        manager.reset();
        assert_eq!(manager.state(), ConnectionState::Uninitialized);

        // A new memory store is built after reset
        let fresh = manager.connection().await.unwrap().unwrap();
        assert!(fresh.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_exposed_once_ready() {
        let manager = ConnectionManager::new(memory_config());
        assert!(manager.memory_store().is_none());

        manager.connection().await.unwrap();
        assert!(manager.memory_store().is_some());
    }

    #[tokio::test]
    async fn test_with_backend_is_ready() {
        let store = StoreBackend::Memory(MemoryStore::new(10));
        let manager = ConnectionManager::with_backend(ConnectionConfig::default(), store);
        assert_eq!(manager.state(), ConnectionState::Ready);
        assert!(manager.connection().await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_sleep_the_linear_backoff() {
        let manager = ConnectionManager::new(ConnectionConfig {
            max_retries: 2,
            ..ConnectionConfig::default()
        });
        let mut attempts = 0;
        let started = Instant::now();

        let result = manager
            .connect_with_retry(|| {
                attempts += 1;
                async { Err(CacheError::Connection("refused".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(CacheError::Connection(_))));
        // One initial attempt plus two retries
        assert_eq!(attempts, 3);
        let config = manager.config();
        assert_eq!(started.elapsed(), config.backoff_for(1) + config.backoff_for(2));
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_at_first_success() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        let mut attempts = 0;
        let started = Instant::now();

        let result = manager
            .connect_with_retry(|| {
                attempts += 1;
                let current = attempts;
                async move {
                    if current < 2 {
                        Err(CacheError::Connection("refused".to_string()))
                    } else {
                        Ok(StoreBackend::Memory(MemoryStore::new(10)))
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts, 2);
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_url_is_not_retried() {
        let manager = ConnectionManager::new(failing_config(FaultPolicy::Throw));
        let started = Instant::now();

        let result = manager.establish().await;

        assert!(matches!(result, Err(CacheError::Config(_))));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_cancelled_attempt_clears_connecting() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        let mut attempt = tokio_test::task::spawn(manager.settle(std::future::pending()));

        assert!(attempt.poll().is_pending());
        assert_eq!(manager.state(), ConnectionState::Connecting);

        // The caller gives up mid-connect
        drop(attempt);
        assert_eq!(manager.state(), ConnectionState::Uninitialized);
    }
}
