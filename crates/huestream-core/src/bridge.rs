// ── Bridge abstraction ──
//
// The session and manager talk to a bridge only through these traits, so
// lifecycle behavior can be exercised against in-process fakes. `HueBridge`
// is the real implementation over huestream-api.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use huestream_api::{BridgeClient, DtlsStream, PskCredentials, StreamOptions};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::model::{Credentials, EntertainmentArea};

/// Everything a streaming session needs from one bridge.
#[async_trait]
pub trait EntertainmentBridge: Send + Sync {
    /// The bridge-issued username. Used as the PSK identity only when the
    /// application id cannot be fetched.
    fn username(&self) -> &SecretString;

    /// The application id, or `None` if the bridge does not report one.
    async fn application_id(&self) -> Result<Option<String>, CoreError>;

    /// Mark an entertainment area active (`true`) or inactive.
    async fn set_area_active(&self, area_id: &str, active: bool) -> Result<(), CoreError>;

    async fn list_areas(&self) -> Result<Vec<EntertainmentArea>, CoreError>;

    /// Run the DTLS handshake with `identity` and return the open channel.
    ///
    /// Cancelling `cancel` must abort the handshake and release the socket.
    async fn open_channel(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn FrameChannel>, CoreError>;
}

/// An established datagram channel that accepts encoded frames.
#[async_trait]
pub trait FrameChannel: Send + Sync {
    /// Hand off one frame without waiting on the network.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), CoreError>;

    /// Close the channel and release its socket.
    async fn close(&mut self);
}

/// Builds a bridge backend from validated credentials.
pub trait BridgeConnector: Send + Sync {
    fn connect(
        &self,
        address: Ipv4Addr,
        credentials: &Credentials,
    ) -> Result<Arc<dyn EntertainmentBridge>, CoreError>;
}

// ── Hue implementation ───────────────────────────────────────────────

/// A real bridge reached over HTTPS and DTLS.
pub struct HueBridge {
    client: BridgeClient,
    stream_addr: SocketAddr,
    username: SecretString,
    client_key: SecretString,
    options: StreamOptions,
}

impl HueBridge {
    /// Build an authenticated client for `https://{address}/`.
    pub fn new(
        address: Ipv4Addr,
        credentials: &Credentials,
        config: &ManagerConfig,
    ) -> Result<Self, CoreError> {
        let base_url =
            Url::parse(&format!("https://{address}/")).map_err(huestream_api::Error::from)?;
        let client =
            BridgeClient::authenticated(base_url, &config.transport(), &credentials.username)?;
        Ok(Self::with_client(
            client,
            SocketAddr::from((address, config.stream_port)),
            credentials,
            config.stream_options(),
        ))
    }

    /// Wrap a pre-built client, streaming to `stream_addr`.
    pub fn with_client(
        client: BridgeClient,
        stream_addr: SocketAddr,
        credentials: &Credentials,
        options: StreamOptions,
    ) -> Self {
        Self {
            client,
            stream_addr,
            username: credentials.username.clone(),
            client_key: credentials.client_key.clone(),
            options,
        }
    }
}

#[async_trait]
impl EntertainmentBridge for HueBridge {
    fn username(&self) -> &SecretString {
        &self.username
    }

    async fn application_id(&self) -> Result<Option<String>, CoreError> {
        Ok(self.client.application_id().await?)
    }

    async fn set_area_active(&self, area_id: &str, active: bool) -> Result<(), CoreError> {
        Ok(self.client.set_streaming(area_id, active).await?)
    }

    async fn list_areas(&self) -> Result<Vec<EntertainmentArea>, CoreError> {
        let raw = self.client.list_entertainment_configurations().await?;
        debug!(count = raw.len(), "fetched entertainment areas");
        Ok(raw.into_iter().map(EntertainmentArea::from).collect())
    }

    async fn open_channel(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn FrameChannel>, CoreError> {
        let psk = PskCredentials::new(identity, &self.client_key)?;
        let stream = DtlsStream::connect(self.stream_addr, &psk, &self.options, cancel).await?;
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl FrameChannel for DtlsStream {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), CoreError> {
        Ok(self.send(frame)?)
    }

    async fn close(&mut self) {
        DtlsStream::close(self).await;
    }
}

/// Connector producing [`HueBridge`] backends.
pub struct HueConnector {
    config: ManagerConfig,
}

impl HueConnector {
    pub fn new(config: ManagerConfig) -> Self {
        Self { config }
    }
}

impl BridgeConnector for HueConnector {
    fn connect(
        &self,
        address: Ipv4Addr,
        credentials: &Credentials,
    ) -> Result<Arc<dyn EntertainmentBridge>, CoreError> {
        Ok(Arc::new(HueBridge::new(address, credentials, &self.config)?))
    }
}
