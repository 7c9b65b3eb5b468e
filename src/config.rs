//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::time::Duration;

// == Environment ==
/// Deployment environment, read from `APP_ENV` (falling back to `NODE_ENV`).
///
/// Only `development`/`dev` and `test` are recognised as non-production;
/// every other name, such as `staging`, is production-like. An unset
/// variable means development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            _ => Environment::Production,
        }
    }

    /// Production-like environments expect the cache to be available.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

// == Fault Policy ==
/// What a connection fault turns into for callers of the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Report the store as absent (`None`); every cache operation degrades.
    Swallow,
    /// Surface the fault as an error.
    Throw,
}

impl FaultPolicy {
    /// Production throws, everything else swallows.
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            FaultPolicy::Throw
        } else {
            FaultPolicy::Swallow
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "throw" => Some(FaultPolicy::Throw),
            "swallow" => Some(FaultPolicy::Swallow),
            _ => None,
        }
    }
}

// == Backend Kind ==
/// Which key-value backend the connection manager builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Redis,
    Memory,
}

impl BackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "redis" => Some(BackendKind::Redis),
            "memory" | "in-memory" => Some(BackendKind::Memory),
            _ => None,
        }
    }
}

// == TTL Policy ==
/// Default TTLs in seconds per cached resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    pub shop_items: u64,
    pub user_inventory: u64,
    pub flash_sale: u64,
    pub user_profile: u64,
    pub testimonials: u64,
    pub faq: u64,
    pub course_levels: u64,
    pub session: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            shop_items: 300,
            user_inventory: 600,
            flash_sale: 3600,
            user_profile: 300,
            testimonials: 3600,
            faq: 7200,
            course_levels: 3600,
            session: 86400,
        }
    }
}

impl TtlPolicy {
    /// Reads `CACHE_TTL_<KIND>` overrides on top of the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shop_items: env_or("CACHE_TTL_SHOP_ITEMS", defaults.shop_items),
            user_inventory: env_or("CACHE_TTL_USER_INVENTORY", defaults.user_inventory),
            flash_sale: env_or("CACHE_TTL_FLASH_SALE", defaults.flash_sale),
            user_profile: env_or("CACHE_TTL_USER_PROFILE", defaults.user_profile),
            testimonials: env_or("CACHE_TTL_TESTIMONIALS", defaults.testimonials),
            faq: env_or("CACHE_TTL_FAQ", defaults.faq),
            course_levels: env_or("CACHE_TTL_COURSE_LEVELS", defaults.course_levels),
            session: env_or("CACHE_TTL_SESSION", defaults.session),
        }
    }
}

// == Connection Settings ==
/// Settings the connection manager needs to build and probe a store.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub backend: BackendKind,
    pub redis_url: String,
    /// `DISABLE_REDIS=true`
    pub disabled: bool,
    /// `false` only when `ENABLE_REDIS_DEV=false`
    pub enable_in_development: bool,
    pub environment: Environment,
    pub fault_policy: FaultPolicy,
    /// Downgrades fault logging to debug in development.
    pub suppress_warnings: bool,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub backoff_step: Duration,
    pub backoff_cap: Duration,
    pub memory_max_entries: usize,
}

impl ConnectionConfig {
    /// True when configuration switches caching off without any I/O.
    pub fn is_disabled(&self) -> bool {
        self.disabled
            || (self.environment == Environment::Development && !self.enable_in_development)
    }

    /// Fault logging is quiet only in development with suppression on.
    pub fn quiet_faults(&self) -> bool {
        self.environment == Environment::Development && self.suppress_warnings
    }

    /// Linear backoff before retry number `attempt` (1-based), capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt).min(self.backoff_cap)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            disabled: false,
            enable_in_development: true,
            environment: Environment::Development,
            fault_policy: FaultPolicy::Swallow,
            suppress_warnings: false,
            connect_timeout: Duration::from_millis(5000),
            max_retries: 3,
            backoff_step: Duration::from_millis(100),
            backoff_cap: Duration::from_millis(3000),
            memory_max_entries: 10_000,
        }
    }
}

// == Content Source Settings ==
/// Where homepage content is read from on a cache miss.
#[derive(Debug, Clone, Default)]
pub struct ContentConfig {
    /// Base URL of the PostgREST-style API, e.g. `https://x.supabase.co/rest/v1`
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub testimonial_limit: usize,
}

// == Rate Limit Settings ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 3600,
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub ttl: TtlPolicy,
    pub rate_limit: RateLimitConfig,
    pub content: ContentConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Purge interval in seconds for the in-memory backend
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Store address (default: redis://localhost:6379)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `DISABLE_REDIS` - `true` turns caching off
    /// - `APP_ENV` / `NODE_ENV` - development, test, or anything else for
    ///   production (default: development)
    /// - `ENABLE_REDIS_DEV` - `false` turns caching off in development
    /// - `SUPPRESS_REDIS_WARNINGS` - `true` quiets fault logs in development
    /// - `CACHE_FAULT_POLICY` - `throw` or `swallow` (default: by environment)
    /// - `REDIS_CONNECT_TIMEOUT_MS`, `REDIS_MAX_RETRIES`, `REDIS_BACKOFF_STEP_MS`,
    ///   `REDIS_BACKOFF_CAP_MS` - connect tuning (5000, 3, 100, 3000)
    /// - `CACHE_TTL_*` - per-kind TTL overrides
    /// - `RATE_LIMIT_MAX_REQUESTS`, `RATE_LIMIT_WINDOW_SECS` - (100, 3600)
    /// - `CONTENT_API_URL`, `CONTENT_API_KEY`, `TESTIMONIAL_LIMIT` (6)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - memory purge frequency in seconds (default: 1)
    /// - `MEMORY_MAX_ENTRIES` - memory backend capacity (default: 10000)
    pub fn from_env() -> Self {
        let environment = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let fault_policy = env::var("CACHE_FAULT_POLICY")
            .ok()
            .and_then(|v| FaultPolicy::parse(&v))
            .unwrap_or_else(|| FaultPolicy::for_environment(environment));

        let defaults = ConnectionConfig::default();
        let connection = ConnectionConfig {
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| BackendKind::parse(&v))
                .unwrap_or(defaults.backend),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            disabled: env_flag("DISABLE_REDIS"),
            enable_in_development: env::var("ENABLE_REDIS_DEV")
                .map(|v| v.trim() != "false")
                .unwrap_or(true),
            environment,
            fault_policy,
            suppress_warnings: env_flag("SUPPRESS_REDIS_WARNINGS"),
            connect_timeout: Duration::from_millis(env_or("REDIS_CONNECT_TIMEOUT_MS", 5000)),
            max_retries: env_or("REDIS_MAX_RETRIES", defaults.max_retries),
            backoff_step: Duration::from_millis(env_or("REDIS_BACKOFF_STEP_MS", 100)),
            backoff_cap: Duration::from_millis(env_or("REDIS_BACKOFF_CAP_MS", 3000)),
            memory_max_entries: env_or("MEMORY_MAX_ENTRIES", defaults.memory_max_entries),
        };

        let rate_defaults = RateLimitConfig::default();

        Self {
            connection,
            ttl: TtlPolicy::from_env(),
            rate_limit: RateLimitConfig {
                max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", rate_defaults.max_requests),
                window_seconds: env_or("RATE_LIMIT_WINDOW_SECS", rate_defaults.window_seconds),
            },
            content: ContentConfig {
                api_url: env::var("CONTENT_API_URL").ok().filter(|v| !v.is_empty()),
                api_key: env::var("CONTENT_API_KEY").ok().filter(|v| !v.is_empty()),
                testimonial_limit: env_or("TESTIMONIAL_LIMIT", 6),
            },
            server_port: env_or("SERVER_PORT", 3000),
            cleanup_interval: env_or("CLEANUP_INTERVAL", 1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            ttl: TtlPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            content: ContentConfig {
                testimonial_limit: 6,
                ..ContentConfig::default()
            },
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| v.trim() == "true").unwrap_or(false)
}
