//! HTTP probes: health waits and the order trigger

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::ProbeError;

/// Request timeout of a single health check
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `url` every `interval` until it answers 2xx
///
/// Connection errors, non-2xx answers and requests that outlive
/// `HEALTH_CHECK_TIMEOUT` count as "not yet". No request runs past the
/// deadline, so a server that accepts connections but never answers still
/// ends the wait after `timeout`.
///
/// # Errors
/// `ProbeError::HealthTimeout` once `timeout` has elapsed without success.
pub async fn wait_healthy(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ProbeError> {
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        match client.get(url).timeout(remaining.min(HEALTH_CHECK_TIMEOUT)).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("{} healthy after {} attempt(s)", url, attempts);
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!("{} answered {}, waiting", url, response.status());
            }
            Err(e) => {
                tracing::debug!("{} unreachable: {}", url, e);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::error!("{} not healthy after {}ms", url, timeout.as_millis());
            return Err(ProbeError::HealthTimeout {
                url: url.to_string(),
                waited: timeout,
            });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Single health check; healthy iff the answer is exactly 200
pub async fn check_health(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).timeout(HEALTH_CHECK_TIMEOUT).send().await {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(e) => {
            tracing::warn!("Health check of {} failed: {}", url, e);
            false
        }
    }
}

/// POST `payload` as JSON to `url` once, giving up after `timeout`
///
/// # Errors
/// - `ProbeError::Http` for a non-2xx answer, with status and body text
/// - `ProbeError::Transport` if no answer arrived in time
pub async fn trigger_order<P>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
    timeout: Duration,
) -> Result<(), ProbeError>
where
    P: Serialize + ?Sized,
{
    tracing::info!("Triggering order via {}", url);
    let response = client.post(url).json(payload).timeout(timeout).send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProbeError::Http {
        url: url.to_string(),
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        body,
    })
}
