//! Outbound notification dispatch for ShopDesk.
//!
//! Transactional messages (one-time codes, receipts, verification results) go
//! out through a third-party provider with a strict per-second ceiling. The
//! [`DispatchQueue`] paces and bounds calls to a [`Transport`], retries
//! transient failures with jittered exponential backoff, and settles every
//! submission exactly once.

pub mod backoff;
pub mod config;
pub mod error;
pub mod http;
pub mod pacing;
pub mod queue;
pub mod transport;

pub use backoff::{MIN_BACKOFF, RetryPolicy};
pub use config::DispatchConfig;
pub use error::{ConfigError, DispatchError, ProviderFailure};
pub use http::{HttpTransport, HttpTransportConfig};
pub use pacing::{PacingPolicy, RateLimit};
pub use queue::{Delivery, DispatchQueue, QueueStats, Submission};
pub use transport::{Classification, Transport};
