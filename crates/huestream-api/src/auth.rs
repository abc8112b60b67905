// Bridge credentials
//
// Secrets issued at registration and the PSK material derived from them.
// Everything sensitive stays behind `secrecy` wrappers.

use secrecy::{ExposeSecret, SecretBox, SecretString};

use crate::error::Error;

/// Header carrying the bridge-issued username on authenticated REST calls.
pub const APPLICATION_KEY_HEADER: &str = "hue-application-key";

/// Response header on `GET /auth/v1` carrying the application id.
pub const APPLICATION_ID_HEADER: &str = "hue-application-id";

/// Length of the client key in bytes (32 hex characters on the wire).
pub const CLIENT_KEY_LEN: usize = 16;

/// Long-lived credentials issued by a bridge during registration.
///
/// `username` doubles as the application key for REST calls; `client_key`
/// is the hex-encoded pre-shared key for the streaming handshake.
#[derive(Debug, Clone)]
pub struct BridgeCredentials {
    pub username: SecretString,
    pub client_key: SecretString,
}

/// Pre-shared key material for the DTLS handshake.
///
/// The identity is sent in cleartext during the handshake; the key never
/// leaves this process.
pub struct PskCredentials {
    identity: String,
    key: SecretBox<[u8; CLIENT_KEY_LEN]>,
}

impl PskCredentials {
    /// Build PSK material from an identity and the hex-encoded client key.
    pub fn new(identity: impl Into<String>, client_key: &SecretString) -> Result<Self, Error> {
        let key = decode_client_key(client_key.expose_secret())?;
        Ok(Self {
            identity: identity.into(),
            key: SecretBox::new(Box::new(key)),
        })
    }

    /// The PSK identity presented to the bridge.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub(crate) fn key_bytes(&self) -> Vec<u8> {
        self.key.expose_secret().to_vec()
    }
}

impl std::fmt::Debug for PskCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PskCredentials")
            .field("identity", &self.identity)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Decode a 32-character hex client key into its 16 raw bytes.
pub fn decode_client_key(input: &str) -> Result<[u8; CLIENT_KEY_LEN], Error> {
    let input = input.trim();
    if input.len() != CLIENT_KEY_LEN * 2 {
        return Err(Error::InvalidClientKey(format!(
            "expected {} hex characters, got {}",
            CLIENT_KEY_LEN * 2,
            input.len()
        )));
    }

    let mut out = [0u8; CLIENT_KEY_LEN];
    for (index, (slot, chunk)) in out.iter_mut().zip(input.as_bytes().chunks(2)).enumerate() {
        let pair = std::str::from_utf8(chunk)
            .map_err(|_| Error::InvalidClientKey("key contains non-ASCII bytes".into()))?;
        *slot = u8::from_str_radix(pair, 16).map_err(|_| {
            Error::InvalidClientKey(format!("invalid hex at byte index {index}"))
        })?;
    }
    Ok(out)
}

/// Shorten an identifier for log output, keeping only a short prefix.
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}…")
}
