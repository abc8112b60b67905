// ── Core error types ──
//
// User-facing errors from huestream-core. Consumers never see HTTP status
// codes or DTLS library errors directly; the `From<huestream_api::Error>`
// impl folds transport failures into the streaming taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Setup errors ─────────────────────────────────────────────────
    #[error("Bridge discovery unavailable: {reason}")]
    DiscoveryUnavailable { reason: String },

    #[error("Link button not pressed: press the button on the bridge and try again")]
    LinkButtonNotPressed,

    #[error("Registration rejected by bridge (type {error_type}): {description}")]
    RegistrationRejected { error_type: u16, description: String },

    #[error("Invalid bridge address '{address}': expected an IPv4 literal")]
    InvalidAddress { address: String },

    #[error("Bridge rejected the application key")]
    Unauthorized,

    // ── Session errors ───────────────────────────────────────────────
    #[error("Failed to activate entertainment area {area_id}: {reason}")]
    ActivationFailed { area_id: String, reason: String },

    #[error("DTLS handshake failed: {reason}")]
    HandshakeFailed { reason: String },

    #[error("DTLS handshake timed out after {timeout_ms}ms")]
    HandshakeTimeout { timeout_ms: u64 },

    #[error("Frame transmission failed: {reason}")]
    TransmissionFailed { reason: String },

    #[error("Streaming session is not connected")]
    NotConnected,

    #[error("Operation cancelled")]
    Cancelled,

    // ── Manager errors ───────────────────────────────────────────────
    #[error("Connection manager not initialized: call init() with bridge credentials first")]
    NotInitialized,

    #[error("Expected {expected} colors for the selected area, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    #[error("Channel {index} out of range (area has {channels} channels)")]
    ChannelOutOfRange { index: usize, channels: usize },

    // ── Transport errors (wrapped, not exposed raw) ──────────────────
    #[error("Cannot reach bridge: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Bridge error: {message}")]
    Bridge { message: String, status: Option<u16> },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fieldless error category, for matching without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    DiscoveryUnavailable,
    LinkButtonNotPressed,
    RegistrationRejected,
    InvalidAddress,
    Unauthorized,
    ActivationFailed,
    HandshakeFailed,
    HandshakeTimeout,
    TransmissionFailed,
    NotConnected,
    Cancelled,
    NotInitialized,
    ChannelCountMismatch,
    ChannelOutOfRange,
    ConnectionFailed,
    Bridge,
    Config,
    Internal,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DiscoveryUnavailable { .. } => ErrorKind::DiscoveryUnavailable,
            Self::LinkButtonNotPressed => ErrorKind::LinkButtonNotPressed,
            Self::RegistrationRejected { .. } => ErrorKind::RegistrationRejected,
            Self::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::ActivationFailed { .. } => ErrorKind::ActivationFailed,
            Self::HandshakeFailed { .. } => ErrorKind::HandshakeFailed,
            Self::HandshakeTimeout { .. } => ErrorKind::HandshakeTimeout,
            Self::TransmissionFailed { .. } => ErrorKind::TransmissionFailed,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::ChannelCountMismatch { .. } => ErrorKind::ChannelCountMismatch,
            Self::ChannelOutOfRange { .. } => ErrorKind::ChannelOutOfRange,
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Self::Bridge { .. } => ErrorKind::Bridge,
            Self::Config { .. } => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<huestream_api::Error> for CoreError {
    fn from(err: huestream_api::Error) -> Self {
        use huestream_api::Error as Api;

        match err {
            err if err.is_unauthorized() => CoreError::Unauthorized,
            Api::DiscoveryUnavailable { reason } => CoreError::DiscoveryUnavailable { reason },
            Api::LinkButtonNotPressed => CoreError::LinkButtonNotPressed,
            Api::Unauthorized => CoreError::Unauthorized,
            Api::RegistrationRejected {
                error_type,
                description,
            } => CoreError::RegistrationRejected {
                error_type,
                description,
            },
            Api::Bridge { message, status } => CoreError::Bridge {
                message,
                status: Some(status),
            },
            Api::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            Api::InvalidClientKey(msg) => CoreError::Config {
                message: format!("Invalid client key: {msg}"),
            },
            Api::Socket(e) => CoreError::HandshakeFailed {
                reason: format!("socket error: {e}"),
            },
            Api::Handshake(reason) => CoreError::HandshakeFailed { reason },
            Api::HandshakeTimeout { timeout_ms } => CoreError::HandshakeTimeout { timeout_ms },
            Api::Cancelled => CoreError::Cancelled,
            Api::ChannelClosed { reason } => CoreError::TransmissionFailed { reason },
            Api::Deserialization { message, .. } => CoreError::Bridge {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}
