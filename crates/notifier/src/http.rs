//! HTTP transport: delivers one JSON payload per POST to the messaging provider.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use shopdesk_common::config::AppConfig;

use crate::error::ProviderFailure;
use crate::transport::{Classification, Transport};

/// Longest provider response body kept in a failure message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP transport settings.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Per-request deadline; the dispatch queue imposes none of its own.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.provider_url.clone(),
            api_key: config.provider_api_key.clone(),
            timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }
}

/// `reqwest`-backed transport that POSTs `P` as JSON.
pub struct HttpTransport<P> {
    config: HttpTransportConfig,
    client: Client,
    _payload: PhantomData<fn(P)>,
}

impl<P> HttpTransport<P> {
    pub fn new(config: HttpTransportConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            client,
            _payload: PhantomData,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl<P> Transport for HttpTransport<P>
where
    P: Serialize + Send + Sync + 'static,
{
    type Payload = P;

    async fn dispatch(&self, payload: &P) -> Classification {
        let mut request = self.client.post(&self.config.endpoint).json(payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify_send_error(&e),
        };

        let status = response.status();
        debug!(endpoint = %self.config.endpoint, status = status.as_u16(), "Provider responded");

        if status.is_success() {
            return Classification::Success;
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        } else {
            body.chars().take(MAX_ERROR_BODY_CHARS).collect()
        };

        Classification::from_status(status.as_u16(), message)
    }
}

/// Timeouts and connection failures are worth retrying; anything else that
/// fails before a response (bad URL, unserializable body) never will succeed.
fn classify_send_error(e: &reqwest::Error) -> Classification {
    let failure = ProviderFailure::network(e.to_string());
    if e.is_timeout() || e.is_connect() || e.is_request() {
        Classification::RetryableFailure(failure)
    } else {
        Classification::TerminalFailure(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig {
            provider_url: "https://sms.example.com/v1/messages".to_string(),
            provider_api_key: Some("key-123".to_string()),
            request_timeout_ms: 2500,
            max_requests_per_interval: 1,
            interval_ms: 1000,
            concurrent_limit: 1,
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
        };
        let config = HttpTransportConfig::from_app_config(&app);
        assert_eq!(config.endpoint, "https://sms.example.com/v1/messages");
        assert_eq!(config.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_transport_creation() {
        let transport: HttpTransport<serde_json::Value> = HttpTransport::new(HttpTransportConfig {
            endpoint: "http://localhost:9/messages".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:9/messages");
    }
}
