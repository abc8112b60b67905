// ── Setup operations ──
//
// Discovery and registration run before a `ConnectionManager` is bound to
// a bridge and never during streaming.

use std::future::Future;
use std::time::Duration;

use huestream_api::{BridgeClient, DiscoveryClient};
use tracing::{debug, info};
use url::Url;

use crate::config::ManagerConfig;
use crate::convert;
use crate::error::CoreError;
use crate::model::{BridgeDevice, Credentials, parse_ipv4};

/// Fixed-interval polling while waiting for the link button.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 15,
        }
    }
}

/// Query the cloud discovery endpoint once.
///
/// Zero bridges is an empty vector. Bridges without an IPv4 address are
/// skipped.
pub async fn discover(config: &ManagerConfig) -> Result<Vec<BridgeDevice>, CoreError> {
    let endpoint = Url::parse(&config.discovery_url).map_err(|e| CoreError::Config {
        message: format!("invalid discovery URL '{}': {e}", config.discovery_url),
    })?;
    let client = DiscoveryClient::new(endpoint, &config.transport())?;
    let bridges: Vec<BridgeDevice> = client
        .discover()
        .await?
        .into_iter()
        .filter_map(convert::bridge_device)
        .collect();
    debug!(count = bridges.len(), "discovered bridges");
    Ok(bridges)
}

/// Single registration attempt.
///
/// Fails with [`CoreError::LinkButtonNotPressed`] until the button on the
/// bridge has been pressed; never loops.
pub async fn register(
    config: &ManagerConfig,
    address: &str,
    label: &str,
) -> Result<Credentials, CoreError> {
    let ip = parse_ipv4(address)?;
    let base_url =
        Url::parse(&format!("https://{ip}/")).map_err(huestream_api::Error::from)?;
    let client = BridgeClient::new(base_url, &config.transport())?;
    let issued = client.register(label).await?;
    info!(%ip, "registered with bridge");
    Ok(convert::credentials(address.trim(), issued))
}

/// Repeat [`register`] while the link button has not been pressed.
///
/// `on_wait(attempt)` runs after each refused attempt, before sleeping.
/// Every other error ends the loop immediately.
pub async fn register_with_retry(
    config: &ManagerConfig,
    address: &str,
    label: &str,
    policy: &RetryPolicy,
    on_wait: impl FnMut(u32),
) -> Result<Credentials, CoreError> {
    // Validate once up front so a bad address never waits out the policy.
    parse_ipv4(address)?;
    poll_registration(policy, on_wait, || register(config, address, label)).await
}

async fn poll_registration<F, Fut, W>(
    policy: &RetryPolicy,
    mut on_wait: W,
    mut attempt_once: F,
) -> Result<Credentials, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Credentials, CoreError>>,
    W: FnMut(u32),
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match attempt_once().await {
            Err(CoreError::LinkButtonNotPressed) if attempt < attempts => {
                debug!(attempt, "link button not pressed yet");
                on_wait(attempt);
                tokio::time::sleep(policy.interval).await;
            }
            other => return other,
        }
    }
    Err(CoreError::LinkButtonNotPressed)
}
