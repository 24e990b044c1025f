//! Rate limiting middleware
//!
//! Fixed-window request counting keyed by `<endpoint prefix>:<client id>`.
//! The first request of a window starts it; requests beyond `max_requests`
//! are rejected until the window's reset time. Counters live in a
//! [`RateLimitStore`]: an in-process map swept periodically, or Redis where
//! keys expire on their own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use redis::aio::ConnectionManager;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::utils::errors::{OfficialIdError, Result};
use crate::utils::logging::log_rate_limited;

/// Requests allowed per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Public form submissions (register, RSVP)
    pub const PUBLIC_FORM: RateLimitPolicy = RateLimitPolicy { max_requests: 10, window: Duration::from_secs(60) };
    /// Public read-only views
    pub const PUBLIC_VIEW: RateLimitPolicy = RateLimitPolicy { max_requests: 30, window: Duration::from_secs(60) };
    /// Authenticated operator endpoints
    pub const AUTHENTICATED: RateLimitPolicy = RateLimitPolicy { max_requests: 60, window: Duration::from_secs(60) };
}

/// Result of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub success: bool,
    pub remaining: u32,
    /// Window end, epoch milliseconds
    pub reset_time: i64,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, at least 1
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = (self.reset_time - now_ms).max(0) as u64;
        wait_ms.div_ceil(1000).max(1)
    }
}

/// Counter state after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    pub reset_time: i64,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomically count one request for `key`, restarting the window when it
    /// is missing or expired
    async fn increment(&self, key: &str, window: Duration, now_ms: i64) -> Result<WindowCount>;

    /// Drop expired windows, returning how many were removed
    async fn sweep(&self, now_ms: i64) -> usize;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    entries: Mutex<HashMap<String, WindowCount>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn increment(&self, key: &str, window: Duration, now_ms: i64) -> Result<WindowCount> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.to_string()).or_insert(WindowCount { count: 0, reset_time: now_ms });

        if entry.reset_time <= now_ms {
            *entry = WindowCount { count: 1, reset_time: now_ms + window.as_millis() as i64 };
        } else {
            entry.count += 1;
        }

        Ok(*entry)
    }

    async fn sweep(&self, now_ms: i64) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_time > now_ms);
        before - entries.len()
    }
}

/// Redis-backed store: `INCR` plus a millisecond TTL set on the first hit
#[derive(Clone)]
pub struct RedisRateLimitStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisRateLimitStore {
    pub async fn connect(url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection,
            prefix: format!("{prefix}ratelimit:"),
        })
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn increment(&self, key: &str, window: Duration, now_ms: i64) -> Result<WindowCount> {
        let mut conn = self.connection.clone();
        let full_key = format!("{}{}", self.prefix, key);
        let window_ms = window.as_millis() as i64;

        let (count, mut ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&full_key)
            .cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await?;

        // A fresh key (or one that lost its TTL) starts the window now
        if ttl_ms < 0 {
            let _: i64 = redis::cmd("PEXPIRE").arg(&full_key).arg(window_ms).query_async(&mut conn).await?;
            ttl_ms = window_ms;
        }

        Ok(WindowCount { count, reset_time: now_ms + ttl_ms })
    }

    async fn sweep(&self, _now_ms: i64) -> usize {
        0
    }
}

/// Rate limiter shared by all handlers
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store, enabled: true }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()))
    }

    /// A limiter that lets everything through
    pub fn disabled() -> Self {
        Self { store: Arc::new(MemoryRateLimitStore::new()), enabled: false }
    }

    pub async fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        self.check_at(key, policy, Utc::now().timestamp_millis()).await
    }

    /// Count a request at `now_ms`. Store failures let the request through.
    pub async fn check_at(&self, key: &str, policy: RateLimitPolicy, now_ms: i64) -> RateLimitDecision {
        let window_end = now_ms + policy.window.as_millis() as i64;
        if !self.enabled {
            return RateLimitDecision { success: true, remaining: policy.max_requests, reset_time: window_end };
        }

        match self.store.increment(key, policy.window, now_ms).await {
            Ok(WindowCount { count, reset_time }) => {
                let max = u64::from(policy.max_requests);
                RateLimitDecision {
                    success: count <= max,
                    remaining: max.saturating_sub(count) as u32,
                    reset_time,
                }
            }
            Err(e) => {
                warn!(key = key, error = %e, "Rate limit store unavailable, allowing request");
                RateLimitDecision { success: true, remaining: policy.max_requests, reset_time: window_end }
            }
        }
    }

    /// Check `<prefix>:<client>` and turn a rejection into an error
    pub async fn enforce(&self, prefix: &str, headers: &HeaderMap, policy: RateLimitPolicy) -> Result<RateLimitDecision> {
        let key = format!("{prefix}:{}", client_identifier(headers));
        let now_ms = Utc::now().timestamp_millis();
        let decision = self.check_at(&key, policy, now_ms).await;

        if decision.success {
            Ok(decision)
        } else {
            let retry_after_secs = decision.retry_after_secs(now_ms);
            log_rate_limited(&key, retry_after_secs);
            Err(OfficialIdError::RateLimitExceeded { retry_after_secs })
        }
    }

    pub async fn sweep(&self) -> usize {
        self.store.sweep(Utc::now().timestamp_millis()).await
    }

    /// Periodically drop expired windows
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep().await;
                if removed > 0 {
                    debug!(removed = removed, "Swept expired rate limit windows");
                }
            }
        })
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("enabled", &self.enabled).finish_non_exhaustive()
    }
}

/// First `x-forwarded-for` entry, else `x-real-ip`, else `"unknown"`
pub fn client_identifier(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Build the limiter for the configured backend, falling back to memory when
/// Redis is unreachable at startup
pub async fn build_rate_limiter(config: &crate::config::Settings) -> RateLimiter {
    use crate::config::RateLimitBackend;

    if !config.rate_limit.enabled {
        info!("Rate limiting disabled");
        return RateLimiter::disabled();
    }

    match config.rate_limit.backend {
        RateLimitBackend::Memory => RateLimiter::in_memory(),
        RateLimitBackend::Redis => match RedisRateLimitStore::connect(&config.redis.url, &config.redis.prefix).await {
            Ok(store) => {
                info!("Using Redis rate limit store");
                RateLimiter::new(Arc::new(store))
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, using in-memory rate limit store");
                RateLimiter::in_memory()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const T0: i64 = 1_700_000_000_000;

    struct FailingStore;

    #[async_trait]
    impl RateLimitStore for FailingStore {
        async fn increment(&self, _key: &str, _window: Duration, _now_ms: i64) -> Result<WindowCount> {
            Err(OfficialIdError::Config("store down".to_string()))
        }

        async fn sweep(&self, _now_ms: i64) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn test_eleventh_form_request_rejected_until_reset() {
        let limiter = RateLimiter::in_memory();
        let policy = RateLimitPolicy::PUBLIC_FORM;

        for i in 0..10 {
            let decision = limiter.check_at("register:1.2.3.4", policy, T0 + i).await;
            assert!(decision.success);
            assert_eq!(decision.remaining, 9 - i as u32);
            assert_eq!(decision.reset_time, T0 + 60_000);
        }

        let rejected = limiter.check_at("register:1.2.3.4", policy, T0 + 30_000).await;
        assert!(!rejected.success);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_time, T0 + 60_000);
        assert_eq!(rejected.retry_after_secs(T0 + 30_000), 30);
        assert_eq!(rejected.retry_after_secs(T0 + 59_001), 1);

        let after_reset = limiter.check_at("register:1.2.3.4", policy, T0 + 60_000).await;
        assert!(after_reset.success);
        assert_eq!(after_reset.remaining, 9);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::in_memory();
        let policy = RateLimitPolicy { max_requests: 1, window: Duration::from_secs(60) };

        assert!(limiter.check_at("rsvp:a", policy, T0).await.success);
        assert!(!limiter.check_at("rsvp:a", policy, T0).await.success);
        assert!(limiter.check_at("rsvp:b", policy, T0).await.success);
        assert!(limiter.check_at("register:a", policy, T0).await.success);
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(FailingStore));
        let decision = limiter.check_at("register:x", RateLimitPolicy::PUBLIC_FORM, T0).await;
        assert!(decision.success);
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_windows() {
        let store = MemoryRateLimitStore::new();
        store.increment("a", Duration::from_secs(60), T0).await.unwrap();
        store.increment("b", Duration::from_secs(10), T0).await.unwrap();

        assert_eq!(store.sweep(T0 + 20_000).await, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.sweep(T0 + 60_000).await, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_client_identifier() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_identifier(&headers), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_identifier(&headers), "10.0.0.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        assert_eq!(client_identifier(&headers), "203.0.113.7");
    }
}
