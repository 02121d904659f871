//! Error types surfaced to callers of the dispatch queue.

use thiserror::Error;

/// A single failed provider call, as classified by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe_failure(.status, .message))]
pub struct ProviderFailure {
    /// HTTP status returned by the provider, if a response was received.
    pub status: Option<u16>,
    pub message: String,
}

fn describe_failure(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

impl ProviderFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Failure with an HTTP status code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    /// Failure before any response arrived (timeout, connection refused).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

/// Why a submitted payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The provider refused the payload; never retried.
    #[error("Permanent provider error after {attempts} attempt(s): {failure}")]
    Permanent {
        failure: ProviderFailure,
        attempts: u32,
    },

    /// Every allowed attempt hit a transient failure (429, 5xx, timeout).
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        #[source]
        last: ProviderFailure,
        attempts: u32,
    },

    /// The runtime dropped the request before it settled.
    #[error("Dispatch queue closed before the request settled")]
    QueueClosed,
}

impl DispatchError {
    /// Number of transport invocations made for the payload, when known.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            DispatchError::Permanent { attempts, .. }
            | DispatchError::RetriesExhausted { attempts, .. } => Some(*attempts),
            DispatchError::QueueClosed => None,
        }
    }

    /// The provider failure behind the rejection, if any.
    pub fn provider_failure(&self) -> Option<&ProviderFailure> {
        match self {
            DispatchError::Permanent { failure, .. } => Some(failure),
            DispatchError::RetriesExhausted { last, .. } => Some(last),
            DispatchError::QueueClosed => None,
        }
    }
}

/// Invalid queue configuration, rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_requests must be at least 1")]
    ZeroMaxRequests,

    #[error("interval_duration must be greater than zero")]
    ZeroInterval,

    #[error("concurrent_limit must be at least 1")]
    ZeroConcurrency,

    #[error("jitter_factor must be in [0, 1), got {0}")]
    JitterOutOfRange(f64),

    #[error("initial_delay ({initial_ms}ms) exceeds max_delay ({max_ms}ms)")]
    DelayBoundsInverted { initial_ms: u128, max_ms: u128 },
}
