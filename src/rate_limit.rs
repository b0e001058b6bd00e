//! Sliding-window request limiting.
//!
//! Counts requests per caller key inside a rolling window. Unlike a token
//! bucket, no burst refill can push a caller past `max_requests` within any
//! window-length interval.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Configuration for a sliding-window limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window.
    pub max_requests: u32,
    /// Length of the window.
    pub window: Duration,
}

impl RateLimitConfig {
    /// Create a new configuration.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// `max_requests` per minute.
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 60)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(10)
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed.
    Allowed,
    /// Request is denied.
    Denied {
        /// Time until the oldest request leaves the window.
        retry_after: Duration,
    },
}

impl RateLimitResult {
    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// Request timestamps for one caller.
#[derive(Debug, Default)]
struct CallerHistory {
    timestamps: Vec<Instant>,
}

impl CallerHistory {
    fn cleanup(&mut self, now: Instant, window: Duration) {
        self.timestamps
            .retain(|&t| now.saturating_duration_since(t) < window);
    }

    fn oldest(&self) -> Option<Instant> {
        self.timestamps.iter().min().copied()
    }
}

/// Per-caller sliding-window limiter.
///
/// # Example
///
/// ```
/// use studio_drive::rate_limit::{RateLimitConfig, SlidingWindowLimiter};
///
/// let limiter = SlidingWindowLimiter::new(RateLimitConfig::per_minute(2));
/// assert!(limiter.check_and_record("10.0.0.1").is_allowed());
/// assert!(limiter.check_and_record("10.0.0.1").is_allowed());
/// assert!(!limiter.check_and_record("10.0.0.1").is_allowed());
/// assert!(limiter.check_and_record("10.0.0.2").is_allowed());
/// ```
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    callers: RwLock<HashMap<String, CallerHistory>>,
}

impl SlidingWindowLimiter {
    /// Create a new limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            callers: RwLock::new(HashMap::new()),
        }
    }

    /// The configured limit.
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check and record in one operation.
    ///
    /// Returns `Allowed` and records the request, or `Denied` without recording.
    pub fn check_and_record(&self, key: &str) -> RateLimitResult {
        self.check_and_record_at(key, Instant::now())
    }

    fn check_and_record_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let mut callers = self
            .callers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let history = callers.entry(key.to_string()).or_default();
        history.cleanup(now, self.config.window);

        if history.timestamps.len() >= self.config.max_requests as usize {
            let retry_after = history
                .oldest()
                .map(|oldest| {
                    self.config
                        .window
                        .saturating_sub(now.saturating_duration_since(oldest))
                })
                .unwrap_or(self.config.window);
            return RateLimitResult::Denied { retry_after };
        }

        history.timestamps.push(now);
        RateLimitResult::Allowed
    }

    /// Number of requests the caller may still make in the current window.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = Instant::now();
        let callers = self.callers.read().unwrap_or_else(PoisonError::into_inner);
        let used = callers
            .get(key)
            .map(|h| {
                h.timestamps
                    .iter()
                    .filter(|&&t| now.saturating_duration_since(t) < self.config.window)
                    .count()
            })
            .unwrap_or(0);
        self.config.max_requests.saturating_sub(used as u32)
    }

    /// Drop expired timestamps and callers with no recent requests.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut callers = self
            .callers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for history in callers.values_mut() {
            history.cleanup(now, self.config.window);
        }
        callers.retain(|_, history| !history.timestamps.is_empty());
    }

    /// Number of callers currently tracked.
    pub fn tracked_callers(&self) -> usize {
        self.callers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
