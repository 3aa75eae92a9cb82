//! Bounded retry with exponential backoff and jitter
//!
//! The controller knows nothing about what failed; callers pass a classifier
//! that decides whether an error is worth another attempt.

use crate::config::{ImageRetryConfig, PageRetryConfig};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Retry parameters for one kind of operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `N` allows at most `N + 1` attempts
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    /// Adds uniform random jitter in `[0, delay)` to each sleep
    pub jitter: bool,
}

impl RetryPolicy {
    /// Policy that never sleeps and never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            backoff_factor: 1.0,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before retry number `retry` (1-based), without jitter
    ///
    /// `min(initial_delay * backoff_factor^(retry - 1), max_delay)`
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else if capped > 0.0 {
            self.max_delay
        } else {
            Duration::ZERO
        }
    }

    /// Backoff before retry number `retry`, with jitter when enabled
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..base.as_secs_f64());
        base + Duration::from_secs_f64(extra)
    }

    /// The full jitter-free sleep schedule, one entry per possible retry
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|n| self.base_delay(n)).collect()
    }
}

impl From<&PageRetryConfig> for RetryPolicy {
    fn from(config: &PageRetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            backoff_factor: config.backoff_factor,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

impl From<&ImageRetryConfig> for RetryPolicy {
    fn from(config: &ImageRetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            backoff_factor: config.backoff_factor,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

/// How a failed attempt should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt if the budget allows
    Transient,
    /// Surfaced immediately
    Fatal,
}

/// The last error of an operation, annotated with how many attempts were made
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    /// True if the operation stopped on a fatal error rather than exhaustion
    pub fatal: bool,
    pub source: E,
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        self.source
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fatal {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{} (after {} attempts)", self.source, self.attempts)
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Runs fallible async operations under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Calls `op` until it succeeds, fails fatally, or the budget runs out
    ///
    /// # Arguments
    ///
    /// * `op` - Produces one attempt per call
    /// * `classify` - Decides whether an error is transient or fatal
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The first successful attempt
    /// * `Err(RetryError<E>)` - The last error with the attempt count
    pub async fn run<T, E, F, Fut, C>(&self, mut op: F, classify: C) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> ErrorClass,
        E: fmt::Display,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if classify(&error) == ErrorClass::Fatal {
                return Err(RetryError {
                    attempts,
                    fatal: true,
                    source: error,
                });
            }

            if attempts > self.policy.max_retries {
                return Err(RetryError {
                    attempts,
                    fatal: false,
                    source: error,
                });
            }

            let delay = self.policy.delay_for(attempts);
            tracing::warn!(
                "Attempt {}/{} failed: {}; retrying in {:?}",
                attempts,
                self.policy.max_attempts(),
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
