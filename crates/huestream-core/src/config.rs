// ── Runtime streaming configuration ──
//
// These types describe *how* to reach a bridge and how patient to be with
// it. They never touch disk: the settings store (or a test) builds a
// `ManagerConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use huestream_api::{DEFAULT_DISCOVERY_URL, STREAM_PORT, StreamOptions, TlsMode, TransportConfig};

/// TLS verification strategy for the bridge's HTTPS API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Default, since bridges ship self-signed certs.
    #[default]
    DangerAcceptInvalid,
}

/// Tuning for a [`ConnectionManager`](crate::ConnectionManager) and the
/// setup operations.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub tls: TlsVerification,
    /// Per-request timeout for REST calls.
    pub timeout: Duration,
    /// Upper bound on the DTLS handshake.
    pub handshake_timeout: Duration,
    /// Delay before the single automatic reconnect attempt.
    pub reconnect_delay: Duration,
    /// Bridge UDP port for entertainment streaming.
    pub stream_port: u16,
    /// Frames buffered ahead of the DTLS writer before new ones are dropped.
    pub frame_queue_depth: usize,
    /// Cloud discovery endpoint.
    pub discovery_url: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_millis(2000),
            stream_port: STREAM_PORT,
            frame_queue_depth: 4,
            discovery_url: DEFAULT_DISCOVERY_URL.into(),
        }
    }
}

impl ManagerConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }

    pub(crate) fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            handshake_timeout: self.handshake_timeout,
            queue_depth: self.frame_queue_depth,
        }
    }
}
