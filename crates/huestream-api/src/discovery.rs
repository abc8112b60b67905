// Cloud bridge discovery
//
// The vendor's discovery service returns the bridges that recently
// announced themselves from the caller's public IP. Local network probing
// (mDNS, SSDP) is left to the host application.

use std::net::IpAddr;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, preview};
use crate::transport::TransportConfig;

/// Default cloud discovery endpoint.
pub const DEFAULT_DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// A bridge as reported by the discovery service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveredBridge {
    pub id: String,
    #[serde(rename = "internalipaddress", alias = "address")]
    pub internal_ip_address: String,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Client for the cloud discovery endpoint.
pub struct DiscoveryClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl DiscoveryClient {
    /// Create a discovery client against the given endpoint.
    pub fn new(endpoint: Url, transport: &TransportConfig) -> Result<Self, Error> {
        // The cloud endpoint has a publicly trusted certificate; only the
        // timeout is inherited from the bridge-facing transport.
        let config = TransportConfig {
            tls: crate::transport::TlsMode::System,
            timeout: transport.timeout,
        };
        Ok(Self {
            http: config.build_client()?,
            endpoint,
        })
    }

    /// Create a discovery client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    /// The discovery endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Query the discovery endpoint once.
    ///
    /// Zero results is an empty vector, not an error. Entries whose
    /// address does not parse as an IP literal are skipped.
    pub async fn discover(&self) -> Result<Vec<DiscoveredBridge>, Error> {
        debug!("GET {}", self.endpoint);

        let resp = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| Error::DiscoveryUnavailable {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::DiscoveryUnavailable {
                reason: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let body = resp.text().await.map_err(|e| Error::DiscoveryUnavailable {
            reason: e.to_string(),
        })?;

        let bridges: Vec<DiscoveredBridge> =
            serde_json::from_str(&body).map_err(|e| Error::deserialization(&e, &body))?;

        let total = bridges.len();
        let bridges: Vec<DiscoveredBridge> = bridges
            .into_iter()
            .filter(|b| b.internal_ip_address.parse::<IpAddr>().is_ok())
            .collect();

        debug!(total, usable = bridges.len(), "discovery complete");
        Ok(bridges)
    }
}
