use serde::Deserialize;

/// Notifier configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Messaging provider endpoint that accepts one notification per POST
    pub provider_url: String,

    /// Provider API key, sent as a bearer token when present
    pub provider_api_key: Option<String>,

    /// Per-request deadline enforced by the HTTP transport (default: 10000)
    pub request_timeout_ms: u64,

    /// Requests the provider accepts per interval (default: 1)
    pub max_requests_per_interval: u32,

    /// Length of the provider's rate-limit interval in milliseconds (default: 1000)
    pub interval_ms: u64,

    /// Maximum number of in-flight provider calls (default: 1)
    pub concurrent_limit: usize,

    /// Retries allowed after the first attempt (default: 3)
    pub max_retries: u32,

    /// Backoff before the first retry in milliseconds (default: 1000)
    pub initial_delay_ms: u64,

    /// Upper bound on the backoff before jitter in milliseconds (default: 30000)
    pub max_delay_ms: u64,

    /// Symmetric jitter applied to each backoff, in [0, 1) (default: 0.2)
    pub jitter_factor: f64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            provider_url: std::env::var("NOTIFY_PROVIDER_URL").map_err(|_| {
                anyhow::anyhow!("NOTIFY_PROVIDER_URL environment variable is required")
            })?,
            provider_api_key: std::env::var("NOTIFY_PROVIDER_API_KEY").ok(),
            request_timeout_ms: parse_var("NOTIFY_REQUEST_TIMEOUT_MS", "10000", "u64")?,
            max_requests_per_interval: parse_var("NOTIFY_MAX_REQUESTS_PER_INTERVAL", "1", "u32")?,
            interval_ms: parse_var("NOTIFY_INTERVAL_MS", "1000", "u64")?,
            concurrent_limit: parse_var("NOTIFY_CONCURRENT_LIMIT", "1", "usize")?,
            max_retries: parse_var("NOTIFY_MAX_RETRIES", "3", "u32")?,
            initial_delay_ms: parse_var("NOTIFY_INITIAL_DELAY_MS", "1000", "u64")?,
            max_delay_ms: parse_var("NOTIFY_MAX_DELAY_MS", "30000", "u64")?,
            jitter_factor: parse_var("NOTIFY_JITTER_FACTOR", "0.2", "f64")?,
        };

        tracing::debug!(
            provider_url = %config.provider_url,
            max_requests_per_interval = config.max_requests_per_interval,
            interval_ms = config.interval_ms,
            concurrent_limit = config.concurrent_limit,
            "Configuration loaded"
        );

        Ok(config)
    }
}

/// Read `name` from the environment, falling back to `default`, and parse it.
fn parse_var<T: std::str::FromStr>(name: &str, default: &str, kind: &str) -> anyhow::Result<T> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a valid {}", name, kind))
}
