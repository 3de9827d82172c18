//! Per-user sliding window rate limiting.
//!
//! Each user id owns an ordered queue of admission instants. Instants older than
//! the window are dropped before every decision, so the queue never holds more
//! than `max_requests` entries.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::warn;

pub struct RateLimiter {
    /// user_id -> admission instants, oldest first
    windows: HashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window_secs` seconds per user.
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            windows: HashMap::new(),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Admit a request for `user_id` now. Returns `false` without recording
    /// anything when the window is full.
    pub fn admit(&mut self, user_id: &str) -> bool {
        self.admit_at(user_id, Instant::now())
    }

    pub fn admit_at(&mut self, user_id: &str, now: Instant) -> bool {
        let window = self.window;
        let timestamps = self.windows.entry(user_id.to_string()).or_default();

        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests {
            warn!(
                user = user_id,
                requests = timestamps.len(),
                max = self.max_requests,
                "Rate limit exceeded"
            );
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Requests still available to `user_id` in the current window.
    pub fn remaining(&self, user_id: &str) -> usize {
        self.remaining_at(user_id, Instant::now())
    }

    pub fn remaining_at(&self, user_id: &str, now: Instant) -> usize {
        self.max_requests.saturating_sub(self.live_count(user_id, now))
    }

    /// Time until the next request would be admitted; zero if one would be admitted now.
    pub fn retry_after_at(&self, user_id: &str, now: Instant) -> Duration {
        if self.live_count(user_id, now) < self.max_requests {
            return Duration::ZERO;
        }
        self.windows
            .get(user_id)
            .and_then(|ts| ts.iter().find(|t| now.saturating_duration_since(**t) < self.window))
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn retry_after(&self, user_id: &str) -> Duration {
        self.retry_after_at(user_id, Instant::now())
    }

    fn live_count(&self, user_id: &str, now: Instant) -> usize {
        self.windows
            .get(user_id)
            .map(|ts| {
                ts.iter()
                    .filter(|t| now.saturating_duration_since(**t) < self.window)
                    .count()
            })
            .unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        // 10 requests per 60 seconds
        Self::new(10, 60)
    }
}
