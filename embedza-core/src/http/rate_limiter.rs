//! Per-host request spacing.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Per-host rate limiter to avoid hammering a single origin while probing
/// many images from one page.
pub struct RateLimiter {
    /// Minimum delay between requests to the same host.
    min_delay: Duration,
    /// Last request time per host.
    last_request: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: DashMap::new(),
        }
    }

    /// Limiter that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait if the previous request to `host` was less than `min_delay` ago.
    pub async fn wait(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        let wait_time = {
            let now = Instant::now();
            self.last_request
                .get(host)
                .map(|last| now.duration_since(*last))
                .filter(|elapsed| *elapsed < self.min_delay)
                .map(|elapsed| self.min_delay - elapsed)
        };

        if let Some(wait_time) = wait_time {
            sleep(wait_time).await;
        }

        self.last_request.insert(host.to_string(), Instant::now());
    }

    /// Number of hosts seen so far.
    pub fn tracked_hosts(&self) -> usize {
        self.last_request.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::disabled()
    }
}
