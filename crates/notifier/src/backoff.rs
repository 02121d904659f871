//! Backoff calculator: exponential retry delay with symmetric jitter.
//!
//! `delay(attempt) = clamp(initial * 2^attempt, MIN_BACKOFF, max)`, scaled by
//! `1 + jitter_factor * u` with `u` drawn uniformly from `[-1, 1]`, then
//! floored at `MIN_BACKOFF`.

use std::time::Duration;

use rand::Rng;

/// Smallest delay ever returned, so a retry never fires immediately.
pub const MIN_BACKOFF: Duration = Duration::from_millis(10);

/// Largest exponent applied to `initial_delay`; beyond this the cap always wins.
const MAX_EXPONENT: u32 = 31;

/// Immutable retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Fraction in `[0, 1)` by which each delay may shrink or grow.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Whether a payload that has already failed `attempt` times may go again.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before retrying a payload whose attempt `attempt` just failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let unit = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_with(attempt, unit)
    }

    /// Same as [`delay`](Self::delay) with the jitter sample supplied by the caller.
    ///
    /// `unit` is clamped to `[-1, 1]`.
    pub fn delay_with(&self, attempt: u32, unit: f64) -> Duration {
        let base = self.base_delay(attempt);
        let unit = if unit.is_finite() { unit.clamp(-1.0, 1.0) } else { 0.0 };
        let scale = 1.0 + self.jitter_factor * unit;
        base.mul_f64(scale.max(0.0)).max(MIN_BACKOFF)
    }

    /// Un-jittered delay: `initial * 2^attempt`, clamped to `[MIN_BACKOFF, max_delay]`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_EXPONENT);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .clamp(MIN_BACKOFF, self.max_delay.max(MIN_BACKOFF))
    }

    /// Upper bound any jittered delay can reach.
    pub fn ceiling(&self) -> Duration {
        self.max_delay
            .max(MIN_BACKOFF)
            .mul_f64(1.0 + self.jitter_factor)
    }
}
