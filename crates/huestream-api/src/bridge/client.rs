// Bridge HTTP client
//
// Wraps `reqwest::Client` with bridge URL construction and `/clip/v2`
// envelope unwrapping. Endpoint groups (registration, entertainment) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::bridge::models::ClipResponse;
use crate::error::{Error, preview};
use crate::transport::TransportConfig;

/// Raw HTTP client for one bridge.
///
/// Handles the `{ errors, data }` envelope of the resource API and
/// builds URLs relative to the bridge root. All `/clip/v2` helpers return
/// unwrapped `data` payloads.
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BridgeClient {
    /// Create a client that has no application key yet.
    ///
    /// Only registration works without a key; resource calls will be
    /// rejected by the bridge.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a client that sends `hue-application-key` on every request.
    pub fn authenticated(
        base_url: Url,
        transport: &TransportConfig,
        application_key: &SecretString,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_authenticated_client(application_key)?,
            base_url,
        })
    }

    /// Create a bridge client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The bridge base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a path relative to the bridge root.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Build a resource URL: `{base}/clip/v2/resource/{path}`.
    pub(crate) fn resource_url(&self, path: &str) -> Result<Url, Error> {
        self.url(&format!("clip/v2/resource/{path}"))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and unwrap the resource envelope.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        Self::parse_envelope(resp).await
    }

    /// Send a PUT request with JSON body and unwrap the resource envelope.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<Vec<T>, Error> {
        debug!("PUT {}", url);

        let resp = self
            .http
            .put(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_envelope(resp).await
    }

    /// Parse the `{ errors, data }` envelope, returning `data` on success
    /// or an `Error::Bridge` if the bridge reported any errors.
    async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Vec<T>, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Unauthorized);
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        // Error responses usually still carry the envelope; prefer its
        // descriptions over the raw body.
        let envelope: Result<ClipResponse<T>, _> = serde_json::from_str(&body);

        if !status.is_success() {
            let message = match &envelope {
                Ok(env) if !env.errors.is_empty() => join_errors(env),
                _ => preview(&body),
            };
            return Err(Error::Bridge {
                message,
                status: status.as_u16(),
            });
        }

        let envelope = envelope.map_err(|e| Error::deserialization(&e, &body))?;
        if !envelope.errors.is_empty() {
            return Err(Error::Bridge {
                message: join_errors(&envelope),
                status: status.as_u16(),
            });
        }

        Ok(envelope.data)
    }
}

fn join_errors<T>(envelope: &ClipResponse<T>) -> String {
    envelope
        .errors
        .iter()
        .map(|e| e.description.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
