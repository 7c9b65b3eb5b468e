//! Fixed-window rate limiter
//!
//! `INCR rate_limit:<id>` counts requests; the first increment of a window
//! arms `EXPIRE`. Bursts of up to twice the limit across a window boundary
//! are accepted.
//!
//! The limiter fails open: when the store is absent or any command fails,
//! the request is allowed and reported with `count = 0`.

use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{keys, CacheClient, Degrade};
use crate::config::RateLimitConfig;
use crate::error::Result;

/// Outcome of one rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub count: u64,
    pub remaining: u64,
    /// Epoch milliseconds; an upper bound on when the window resets
    pub reset_time: i64,
}

impl RateLimitDecision {
    fn from_count(count: u64, max_requests: u64, window_seconds: u64) -> Self {
        Self {
            allowed: count <= max_requests,
            count,
            remaining: max_requests.saturating_sub(count),
            reset_time: reset_time(window_seconds),
        }
    }

    fn fail_open(max_requests: u64, window_seconds: u64) -> Self {
        Self {
            allowed: true,
            count: 0,
            remaining: max_requests,
            reset_time: reset_time(window_seconds),
        }
    }
}

fn reset_time(window_seconds: u64) -> i64 {
    let window_ms = i64::try_from(window_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
    Utc::now().timestamp_millis().saturating_add(window_ms)
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    client: CacheClient,
    defaults: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(client: CacheClient, defaults: RateLimitConfig) -> Self {
        Self { client, defaults }
    }

    pub fn defaults(&self) -> &RateLimitConfig {
        &self.defaults
    }

    /// Checks `identifier` against the configured defaults.
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_rate_limit(
            identifier,
            self.defaults.max_requests,
            self.defaults.window_seconds,
        )
        .await
    }

    /// Counts one request for `identifier` and decides whether it is allowed.
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> RateLimitDecision {
        let key = keys::rate_limit(identifier);
        let fallback = RateLimitDecision::fail_open(max_requests, window_seconds);

        let result: Result<RateLimitDecision> = self
            .client
            .guard("rate_limit", Degrade::FailOpen, fallback.clone(), |store| async move {
                let current = store.incr(&key).await?;
                if current == 1 {
                    store.expire(&key, window_seconds.max(1)).await?;
                }
                let count = u64::try_from(current).unwrap_or(0);
                debug!(key = %key, count, max_requests, "Rate limit counted");
                Ok(RateLimitDecision::from_count(
                    count,
                    max_requests,
                    window_seconds,
                ))
            })
            .await;

        match result {
            Ok(decision) => decision,
            Err(e) => {
                warn!(identifier, error = %e, "Rate limit check failed, allowing request");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::{disabled_client, memory_client};
    use proptest::prelude::*;
    use std::time::Duration;

    fn limiter() -> RateLimiter {
        RateLimiter::new(memory_client(), RateLimitConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_window_sequence() {
        let limiter = limiter();
        let mut allowed = Vec::new();
        let mut remaining = Vec::new();
        for _ in 0..4 {
            let decision = limiter.check_rate_limit("ip1", 3, 60).await;
            allowed.push(decision.allowed);
            remaining.push(decision.remaining);
        }
        assert_eq!(allowed, vec![true, true, true, false]);
        assert_eq!(remaining, vec![2, 1, 0, 0]);

        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = limiter.check_rate_limit("ip1", 3, 60).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.count, 1);
        assert_eq!(fresh.remaining, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_counts_from_first_increment() {
        let limiter = limiter();
        limiter.check_rate_limit("ip1", 10, 60).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        let second = limiter.check_rate_limit("ip1", 10, 60).await;
        assert_eq!(second.count, 2);

        // Later increments do not extend the window
        tokio::time::advance(Duration::from_secs(30)).await;
        let next_window = limiter.check_rate_limit("ip1", 10, 60).await;
        assert_eq!(next_window.count, 1);
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let limiter = limiter();
        limiter.check_rate_limit("a", 1, 60).await;
        let blocked = limiter.check_rate_limit("a", 1, 60).await;
        let other = limiter.check_rate_limit("b", 1, 60).await;
        assert!(!blocked.allowed);
        assert!(other.allowed);
    }

    #[tokio::test]
    async fn test_reset_time_is_in_the_future() {
        let before = Utc::now().timestamp_millis();
        let decision = limiter().check_rate_limit("ip1", 5, 60).await;
        assert!(decision.reset_time >= before + 60_000);
    }

    #[tokio::test]
    async fn test_fails_open_without_store() {
        let limiter = RateLimiter::new(disabled_client(), RateLimitConfig::default());
        for _ in 0..3 {
            let decision = limiter.check_rate_limit("ip1", 1, 60).await;
            assert!(decision.allowed);
            assert_eq!(decision.count, 0);
            assert_eq!(decision.remaining, 1);
        }
    }

    #[tokio::test]
    async fn test_fails_open_on_connection_fault() {
        use crate::cache::CacheStats;
        use crate::config::{ConnectionConfig, FaultPolicy};
        use crate::connection::ConnectionManager;
        use std::sync::Arc;

        let config = ConnectionConfig {
            redis_url: "not a redis url".to_string(),
            fault_policy: FaultPolicy::Throw,
            max_retries: 0,
            ..ConnectionConfig::default()
        };
        let client = CacheClient::new(
            Arc::new(ConnectionManager::new(config)),
            Arc::new(CacheStats::new()),
        );
        let decision = RateLimiter::new(client, RateLimitConfig::default())
            .check("homepage:1.2.3.4")
            .await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 100);
    }

    proptest! {
        #[test]
        fn prop_decision_arithmetic(count in 0u64..10_000, max in 0u64..10_000) {
            let decision = RateLimitDecision::from_count(count, max, 60);
            prop_assert_eq!(decision.allowed, count <= max);
            prop_assert_eq!(decision.remaining, max.saturating_sub(count));
            prop_assert!(decision.remaining <= max);
        }

        #[test]
        fn prop_allowed_requests_never_exceed_limit(max in 1u64..20, calls in 1usize..40) {
            let allowed = tokio_test::block_on(async {
                let limiter = limiter();
                let mut allowed = 0u64;
                for _ in 0..calls {
                    if limiter.check_rate_limit("prop", max, 3600).await.allowed {
                        allowed += 1;
                    }
                }
                allowed
            });
            prop_assert_eq!(allowed, max.min(calls as u64));
        }
    }
}
