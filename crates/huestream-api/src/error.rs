use thiserror::Error;

/// Top-level error type for the `huestream-api` crate.
///
/// Covers every failure mode across the bridge surfaces:
/// cloud discovery, registration, the JSON resource API, and the
/// secure streaming channel. `huestream-core` maps these into the
/// user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Discovery ───────────────────────────────────────────────────
    /// The cloud discovery endpoint could not be reached or answered
    /// with a non-success status.
    #[error("Bridge discovery unavailable: {reason}")]
    DiscoveryUnavailable { reason: String },

    // ── Registration ────────────────────────────────────────────────
    /// The bridge refused registration because its link button has not
    /// been pressed within the pairing window.
    #[error("Link button not pressed")]
    LinkButtonNotPressed,

    /// Any other bridge-reported registration error.
    #[error("Registration rejected (type {error_type}): {description}")]
    RegistrationRejected { error_type: u16, description: String },

    // ── Resource API ────────────────────────────────────────────────
    /// The application key was not accepted by the bridge.
    #[error("Unauthorized -- application key rejected by bridge")]
    Unauthorized,

    /// Structured error from the bridge's resource API.
    #[error("Bridge API error (HTTP {status}): {message}")]
    Bridge { message: String, status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Streaming channel ───────────────────────────────────────────
    /// The client key is not 32 hex characters.
    #[error("Invalid client key: {0}")]
    InvalidClientKey(String),

    /// UDP socket setup failed before the handshake could begin.
    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// The DTLS handshake was rejected or aborted.
    #[error("DTLS handshake failed: {0}")]
    Handshake(String),

    /// The DTLS handshake did not complete in time.
    #[error("DTLS handshake timed out after {timeout_ms}ms")]
    HandshakeTimeout { timeout_ms: u64 },

    /// The handshake was abandoned because the caller cancelled it.
    #[error("DTLS handshake cancelled")]
    Cancelled,

    /// The streaming channel has shut down; no more frames can be queued.
    #[error("Streaming channel closed: {reason}")]
    ChannelClosed { reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the bridge rejected the application key.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Unauthorized => true,
            Self::Bridge { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    pub(crate) fn deserialization(err: &serde_json::Error, body: &str) -> Self {
        Self::Deserialization {
            message: format!("{err} (body preview: {:?})", preview(body)),
            body: body.to_owned(),
        }
    }
}

/// First 200 characters of a response body, for error messages.
pub(crate) fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_counts_as_unauthorized() {
        let err = Error::Bridge {
            message: "forbidden".into(),
            status: 403,
        };
        assert!(err.is_unauthorized());
        assert!(Error::Unauthorized.is_unauthorized());
    }

    #[test]
    fn deserialization_preview_is_bounded() {
        let body = "x".repeat(500);
        let parse_err = serde_json::from_str::<serde_json::Value>(&body).unwrap_err();
        match Error::deserialization(&parse_err, &body) {
            Error::Deserialization { message, body: raw } => {
                assert!(message.len() < 300);
                assert_eq!(raw.len(), 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
