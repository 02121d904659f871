use std::time::Duration;

use shopdesk_common::config::AppConfig;

use crate::backoff::RetryPolicy;
use crate::error::ConfigError;
use crate::pacing::RateLimit;

/// Construction-time configuration for one dispatch queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchConfig {
    pub rate_limit: RateLimit,
    pub retry: RetryPolicy,
}

impl DispatchConfig {
    pub fn new(rate_limit: RateLimit, retry: RetryPolicy) -> Self {
        Self { rate_limit, retry }
    }

    /// Build the queue configuration from the `NOTIFY_*` environment settings.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            rate_limit: RateLimit {
                max_requests: config.max_requests_per_interval,
                interval_duration: Duration::from_millis(config.interval_ms),
                concurrent_limit: config.concurrent_limit,
            },
            retry: RetryPolicy {
                max_retries: config.max_retries,
                initial_delay: Duration::from_millis(config.initial_delay_ms),
                max_delay: Duration::from_millis(config.max_delay_ms),
                jitter_factor: config.jitter_factor,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if self.rate_limit.interval_duration.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.rate_limit.concurrent_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let jitter = self.retry.jitter_factor;
        if !jitter.is_finite() || !(0.0..1.0).contains(&jitter) {
            return Err(ConfigError::JitterOutOfRange(jitter));
        }

        if self.retry.initial_delay > self.retry.max_delay {
            return Err(ConfigError::DelayBoundsInverted {
                initial_ms: self.retry.initial_delay.as_millis(),
                max_ms: self.retry.max_delay.as_millis(),
            });
        }

        Ok(())
    }
}
