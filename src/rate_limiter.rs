//! Fixed-delay pacing for remote catalog calls
//!
//! Each pipeline stage owns one [`RateLimiter`] and calls [`RateLimiter::wait`] once
//! after every unit of work (a search page, a product), whatever its outcome. There
//! is no queueing, no fairness and no per-endpoint distinction: the remote catalog
//! has an unstated budget and one fixed delay per stage keeps us inside it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Fixed inter-call delay for one pipeline stage
///
/// Cloning shares the wait counter, so a clone handed to a helper still reports
/// into the same totals.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    /// Delay applied by every `wait()`
    delay: Duration,
    /// Number of completed waits
    waits: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Create a limiter that pauses for `delay` on every wait
    ///
    /// # Examples
    ///
    /// ```
    /// use catalog_mirror::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::new(Duration::from_secs(5));
    /// assert_eq!(limiter.delay(), Duration::from_secs(5));
    /// ```
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            waits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Suspend the calling stage for at least the configured delay
    pub async fn wait(&self) {
        self.wait_for(self.delay).await;
    }

    /// Suspend the calling stage for at least `duration`
    pub async fn wait_for(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
        self.waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of waits performed so far
    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_wait_sleeps_at_least_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(40));

        let start = Instant::now();
        limiter.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(40),
            "waited only {elapsed:?}"
        );
        assert_eq!(limiter.waits(), 1);
    }

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let limiter = RateLimiter::new(Duration::ZERO);

        let start = Instant::now();
        for _ in 0..100 {
            limiter.wait().await;
        }

        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(limiter.waits(), 100);
    }

    #[tokio::test]
    async fn test_wait_for_overrides_delay() {
        let limiter = RateLimiter::new(Duration::from_secs(3600));

        let start = Instant::now();
        limiter.wait_for(Duration::from_millis(10)).await;

        assert!(start.elapsed() >= Duration::from_millis(10));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_clones_share_wait_count() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let clone = limiter.clone();

        limiter.wait().await;
        clone.wait().await;

        assert_eq!(limiter.waits(), 2);
        assert_eq!(clone.waits(), 2);
    }
}
