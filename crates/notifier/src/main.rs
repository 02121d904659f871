//! ShopDesk notifier worker.
//!
//! Reads newline-delimited JSON notifications from stdin and delivers them
//! through the configured provider, honoring its rate limit.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use shopdesk_common::config::AppConfig;
use shopdesk_common::types::{DeliveryStatus, Notification};
use shopdesk_notifier::{DispatchConfig, DispatchQueue, HttpTransport, HttpTransportConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopdesk_notifier=info".into()),
        )
        .json()
        .init();

    tracing::info!("ShopDesk Notifier starting...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let dispatch_config = DispatchConfig::from_app_config(&config);
    let transport =
        HttpTransport::<Notification>::new(HttpTransportConfig::from_app_config(&config))?;
    let queue = DispatchQueue::new(transport, dispatch_config)?;

    tracing::info!(
        provider_url = %config.provider_url,
        min_spacing = ?queue.config().rate_limit.min_spacing(),
        concurrent_limit = queue.config().rate_limit.concurrent_limit,
        max_retries = queue.config().retry.max_retries,
        "Dispatch queue ready, reading notifications from stdin"
    );

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = run(&queue) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Notifier exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            let stats = queue.stats();
            tracing::info!(
                waiting = stats.waiting,
                active = stats.active,
                "Received shutdown signal, abandoning unsent notifications"
            );
        }
    }

    tracing::info!("ShopDesk Notifier stopped.");
    Ok(())
}

/// Submit every stdin line, then wait for all submissions to settle.
async fn run(queue: &DispatchQueue<HttpTransport<Notification>>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = JoinSet::new();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let notification: Notification = match serde_json::from_str(&line) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed notification");
                continue;
            }
        };

        let channel = notification.channel;
        let reference = notification.reference.clone();
        let submission = queue.submit(notification);
        let request_id = submission.request_id();

        pending.spawn(async move {
            match submission.await {
                Ok(delivery) => {
                    tracing::info!(
                        request_id = %request_id,
                        channel = %channel,
                        reference = reference.as_deref(),
                        attempts = delivery.attempts,
                        status = %DeliveryStatus::Sent,
                        "Notification settled"
                    );
                    DeliveryStatus::Sent
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        channel = %channel,
                        reference = reference.as_deref(),
                        attempts = e.attempts(),
                        status = %DeliveryStatus::Failed,
                        error = %e,
                        "Notification settled"
                    );
                    DeliveryStatus::Failed
                }
            }
        });
    }

    let mut sent = 0u64;
    let mut failed = 0u64;
    while let Some(joined) = pending.join_next().await {
        match joined? {
            DeliveryStatus::Sent => sent += 1,
            DeliveryStatus::Failed => failed += 1,
        }
    }

    tracing::info!(sent, failed, "All notifications settled");
    Ok(())
}
