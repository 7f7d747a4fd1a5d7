//! Fixed-interval throttle applied before every upstream network call.
//!
//! This bounds the per-thread call rate but does not smooth bursts: parallel
//! fan-out workers each sleep independently before their own call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    calls: AtomicU64,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU64::new(0),
        }
    }

    /// No delay. Used by tests and offline fakes.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn from_secs_f64(delay_secs: f64) -> Self {
        Self::new(Duration::from_secs_f64(delay_secs.max(0.0)))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep the configured delay. Call once per network request.
    pub fn throttle(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }

    /// Number of throttled calls since construction.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn throttle_sleeps_configured_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        let start = Instant::now();
        limiter.throttle();
        limiter.throttle();
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(limiter.calls(), 2);
    }

    #[test]
    fn disabled_limiter_still_counts() {
        let limiter = RateLimiter::disabled();
        limiter.throttle();
        assert_eq!(limiter.calls(), 1);
        assert!(limiter.delay().is_zero());
    }

    #[test]
    fn negative_delay_clamps_to_zero() {
        let limiter = RateLimiter::from_secs_f64(-1.0);
        assert!(limiter.delay().is_zero());
    }
}
