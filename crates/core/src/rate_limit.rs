//! Token bucket rate limiting for outbound API calls
//!
//! The public VirusTotal API allows four requests per minute. Scanning a
//! single file costs one upload plus several polls, so the client keeps a
//! bucket per service and waits for a token instead of burning quota on
//! requests that would come back as HTTP 429.
//!
//! # Example
//!
//! ```rust,ignore
//! use zerobyte_core::rate_limit::{RateLimiter, RateLimitConfig};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::virustotal_public());
//!
//! if limiter.try_acquire("virustotal") {
//!     // Proceed with API call
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
    /// Burst allowance (extra requests allowed in short bursts)
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            burst: 10,
        }
    }
}

impl RateLimitConfig {
    /// Create a strict rate limit (no burst)
    #[must_use]
    pub fn strict(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            burst: 0,
        }
    }

    /// Per-second rate limit
    #[must_use]
    pub fn per_second(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(1),
            burst: max / 2,
        }
    }

    /// Per-minute rate limit
    #[must_use]
    pub fn per_minute(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(60),
            burst: max / 4,
        }
    }

    /// Quota of the public VirusTotal API key tier
    #[must_use]
    pub fn virustotal_public() -> Self {
        Self::strict(4, Duration::from_secs(60))
    }

    fn capacity(&self) -> f64 {
        f64::from(self.max_requests + self.burst)
    }

    fn refill_rate(&self) -> f64 {
        f64::from(self.max_requests) / self.window.as_secs_f64().max(f64::EPSILON)
    }
}

/// Token bucket state
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    config: RateLimitConfig,
}

impl TokenBucket {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            tokens: config.capacity(),
            last_update: Instant::now(),
            config,
        }
    }

    fn try_acquire(&mut self, tokens: u32) -> bool {
        self.refill();

        if self.tokens >= f64::from(tokens) {
            self.tokens -= f64::from(tokens);
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);
        let new_tokens = elapsed.as_secs_f64() * self.config.refill_rate();

        self.tokens = (self.tokens + new_tokens).min(self.config.capacity());
        self.last_update = now;
    }

    fn available(&mut self) -> u32 {
        self.refill();
        self.tokens as u32
    }

    fn time_until_available(&mut self, tokens: u32) -> Duration {
        self.refill();

        if self.tokens >= f64::from(tokens) {
            return Duration::ZERO;
        }

        let needed = f64::from(tokens) - self.tokens;
        Duration::from_secs_f64(needed / self.config.refill_rate())
    }
}

/// Rate limiter with one bucket per key
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
    default_config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            default_config: config,
        }
    }

    fn with_bucket<R>(&self, key: &str, f: impl FnOnce(&mut TokenBucket) -> R) -> R {
        // A poisoned lock still holds valid bucket state
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.default_config.clone()));
        f(bucket)
    }

    /// Try to acquire a token for the given key
    #[must_use]
    pub fn try_acquire(&self, key: &str) -> bool {
        self.try_acquire_n(key, 1)
    }

    /// Try to acquire multiple tokens
    #[must_use]
    pub fn try_acquire_n(&self, key: &str, tokens: u32) -> bool {
        self.with_bucket(key, |b| b.try_acquire(tokens))
    }

    /// Wait until a token is available, then take it
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&self, key: &str) -> Duration {
        let start = Instant::now();
        loop {
            if self.try_acquire(key) {
                return start.elapsed();
            }
            let wait = self.time_until_available(key, 1);
            tracing::debug!(key, wait_ms = wait.as_millis() as u64, "rate limited, waiting");
            tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
        }
    }

    /// Get available tokens for a key
    #[must_use]
    pub fn available(&self, key: &str) -> u32 {
        self.with_bucket(key, TokenBucket::available)
    }

    /// Get time until tokens are available
    #[must_use]
    pub fn time_until_available(&self, key: &str, tokens: u32) -> Duration {
        self.with_bucket(key, |b| b.time_until_available(tokens))
    }

    /// Reset rate limit for a key
    pub fn reset(&self, key: &str) {
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        buckets.remove(key);
    }

    /// Reset all rate limits
    pub fn reset_all(&self) {
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        buckets.clear();
    }

    /// Get rate limit status
    #[must_use]
    pub fn status(&self, key: &str) -> RateLimitStatus {
        let max = self.default_config.max_requests + self.default_config.burst;
        let refill_all = self.default_config.max_requests;
        self.with_bucket(key, |bucket| RateLimitStatus {
            available: bucket.available(),
            max,
            reset_in: bucket.time_until_available(refill_all),
        })
    }
}

/// Rate limit status
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    /// Available tokens
    pub available: u32,
    /// Maximum tokens
    pub max: u32,
    /// Time until full reset
    pub reset_in: Duration,
}
