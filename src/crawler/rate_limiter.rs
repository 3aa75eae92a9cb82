//! Per-host request pacing
//!
//! Each host gets a token bucket holding at most `burst` tokens and refilling at
//! `requests_per_second`. A request consumes one token; callers without a token
//! are suspended until one is available.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Tolerance for floating point refill arithmetic
const TOKEN_EPSILON: f64 = 1e-9;

/// Slowest accepted refill rate; zero, negative and NaN rates are raised to it
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.001;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant, rate: f64, capacity: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

/// Token-bucket rate limiter keyed by host
///
/// Safe to share between tasks; the bucket map is guarded by a mutex that is
/// never held across an await point.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// Creates a limiter refilling `requests_per_second` tokens per second per
    /// host, with room for `burst` back-to-back requests
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let rate = if requests_per_second > MIN_REQUESTS_PER_SECOND {
            requests_per_second
        } else {
            MIN_REQUESTS_PER_SECOND
        };

        Self {
            rate,
            capacity: f64::from(burst.max(1)),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst)
    }

    /// Waits until a token for `host` is available, then consumes it
    ///
    /// Never fails; the only effect is delay.
    pub async fn acquire(&self, host: &str) {
        while let Some(wait) = self.take_or_wait(host) {
            tracing::trace!("Pacing {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Consumes a token for `host` if one is available right now
    pub fn try_acquire(&self, host: &str) -> bool {
        self.take_or_wait(host).is_none()
    }

    /// Tokens currently available for `host`, after refill
    pub fn available(&self, host: &str) -> f64 {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        match buckets.get_mut(host) {
            Some(bucket) => {
                bucket.refill(now, self.rate, self.capacity);
                bucket.tokens
            }
            None => self.capacity,
        }
    }

    /// Takes a token and returns `None`, or returns how long until one exists
    fn take_or_wait(&self, host: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets
            .entry(host.to_string())
            .or_insert_with(|| TokenBucket::full(self.capacity, now));

        bucket.refill(now, self.rate, self.capacity);

        if bucket.tokens + TOKEN_EPSILON >= 1.0 {
            bucket.tokens = (bucket.tokens - 1.0).max(0.0);
            None
        } else {
            let missing = 1.0 - bucket.tokens;
            Some(Duration::from_secs_f64(missing / self.rate))
        }
    }
}
