//! Rate limiting and retry timing
//!
//! - `RateLimiter`: one global minimum spacing between network requests
//! - `RetryPolicy`: the delay before each retry and when to give up

use crate::config::CrawlerConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between successive network requests
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left before the next request may start
    ///
    /// # Returns
    ///
    /// * `None` - A request may start now
    /// * `Some(Duration)` - The time to wait
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let ready_at = last + self.interval;
        if now >= ready_at {
            None
        } else {
            Some(ready_at - now)
        }
    }

    /// Waits until a request may start, then records it as started
    pub async fn wait(&mut self) {
        if let Some(delay) = self.time_until_next_request(Instant::now()) {
            tracing::trace!("Rate limit: waiting {:?}", delay);
            tokio::time::sleep(delay).await;
        }
        self.last_request = Some(Instant::now());
    }
}

/// Delay schedule for retrying a failed request
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub backoff: f64,
    pub max_delay: Duration,
    /// Attempts before giving up; `None` retries until success
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.retry_delay_ms),
            backoff: config.retry_backoff,
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
            max_attempts: config.max_attempts,
        }
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Whether the given number of failed attempts exhausts the policy
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            backoff: 2.0,
            max_delay: Duration::from_millis(60_000),
            max_attempts: None,
        }
    }
}
