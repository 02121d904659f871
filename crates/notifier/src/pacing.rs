//! Pacing policy: minimum spacing between dispatch starts.
//!
//! This is soft pacing, not a token bucket: there is no burst credit. The
//! concurrency limit bounds in-flight calls independently.

use std::time::Duration;

use tokio::time::Instant;

/// Immutable provider rate-limit configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests the provider accepts per `interval_duration`.
    pub max_requests: u32,
    pub interval_duration: Duration,
    /// Maximum number of simultaneous in-flight provider calls.
    pub concurrent_limit: usize,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 1,
            interval_duration: Duration::from_secs(1),
            concurrent_limit: 1,
        }
    }
}

impl RateLimit {
    /// `interval_duration / max_requests`.
    pub fn min_spacing(&self) -> Duration {
        self.interval_duration / self.max_requests.max(1)
    }
}

/// Computes how long the queue must wait before starting the next dispatch.
#[derive(Debug, Clone, Copy)]
pub struct PacingPolicy {
    min_spacing: Duration,
}

impl PacingPolicy {
    pub fn new(rate_limit: &RateLimit) -> Self {
        Self {
            min_spacing: rate_limit.min_spacing(),
        }
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Remaining wait before a dispatch may start at `now`.
    ///
    /// Returns `Duration::ZERO` when nothing has been dispatched yet or the
    /// spacing has already elapsed.
    pub fn wait_before(&self, last_dispatch: Option<Instant>, now: Instant) -> Duration {
        match last_dispatch {
            Some(last) => self
                .min_spacing
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_requests: u32, interval_ms: u64) -> PacingPolicy {
        PacingPolicy::new(&RateLimit {
            max_requests,
            interval_duration: Duration::from_millis(interval_ms),
            concurrent_limit: 1,
        })
    }

    #[test]
    fn test_min_spacing() {
        assert_eq!(policy(2, 1000).min_spacing(), Duration::from_millis(500));
        assert_eq!(policy(1, 1000).min_spacing(), Duration::from_millis(1000));
        assert_eq!(policy(3, 1000).min_spacing(), Duration::from_nanos(333_333_333));
    }

    #[test]
    fn test_first_dispatch_never_waits() {
        let now = Instant::now();
        assert_eq!(policy(2, 1000).wait_before(None, now), Duration::ZERO);
    }

    #[test]
    fn test_waits_for_remainder() {
        let last = Instant::now();
        let now = last + Duration::from_millis(200);
        assert_eq!(
            policy(2, 1000).wait_before(Some(last), now),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_no_wait_once_spacing_elapsed() {
        let last = Instant::now();
        let p = policy(2, 1000);
        assert_eq!(
            p.wait_before(Some(last), last + Duration::from_millis(500)),
            Duration::ZERO
        );
        assert_eq!(
            p.wait_before(Some(last), last + Duration::from_secs(5)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_clock_behind_last_dispatch_waits_full_spacing() {
        let now = Instant::now();
        let last = now + Duration::from_millis(50);
        assert_eq!(
            policy(4, 1000).wait_before(Some(last), now),
            Duration::from_millis(250)
        );
    }
}
