//! Transport adapter contract consumed by the dispatch queue.

use std::future::Future;

use crate::error::ProviderFailure;

/// Classified outcome of one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// Throttling or server-side trouble; worth another attempt.
    RetryableFailure(ProviderFailure),
    /// The provider will never accept this payload.
    TerminalFailure(ProviderFailure),
}

impl Classification {
    /// Classify an HTTP status code: 2xx succeeds, 429 and 5xx are retryable,
    /// everything else is terminal.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            200..=299 => Classification::Success,
            429 | 500..=599 => {
                Classification::RetryableFailure(ProviderFailure::http(status, message))
            }
            _ => Classification::TerminalFailure(ProviderFailure::http(status, message)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Classification::Success)
    }
}

/// Performs one outbound call for one payload.
///
/// Implementations must turn every failure into a [`Classification`] and must
/// enforce their own deadline: the queue never times out a call, so a hung
/// call holds a concurrency slot for as long as it runs.
pub trait Transport: Send + Sync + 'static {
    type Payload: Send + Sync + 'static;

    fn dispatch(&self, payload: &Self::Payload) -> impl Future<Output = Classification> + Send;
}
