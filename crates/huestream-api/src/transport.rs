// Shared transport configuration for building reqwest::Client instances.
//
// Discovery, registration, and the authenticated bridge client share TLS
// and timeout settings through this module, avoiding duplicated builder logic.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::auth::APPLICATION_KEY_HEADER;
use crate::error::Error;

const USER_AGENT: &str = concat!("huestream/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode for bridge-facing HTTP clients.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (bridges ship self-signed certificates).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build an unauthenticated `reqwest::Client` from this config.
    ///
    /// Used for discovery and registration, which run before the
    /// application key exists.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.builder()?
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build a `reqwest::Client` that sends the `hue-application-key`
    /// header on every request.
    ///
    /// The header value is marked sensitive so it never shows up in
    /// reqwest's debug output.
    pub fn build_authenticated_client(
        &self,
        application_key: &SecretString,
    ) -> Result<reqwest::Client, Error> {
        let mut value = HeaderValue::from_str(application_key.expose_secret())
            .map_err(|_| Error::Unauthorized)?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(APPLICATION_KEY_HEADER, value);

        self.builder()?
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    fn builder(&self) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(builder)
    }
}
