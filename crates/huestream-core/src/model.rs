// ── Domain model ──
//
// Canonical types shared by the session, the manager, and host
// applications. Wire shapes live in huestream-api; `convert` maps them here.

use std::net::Ipv4Addr;

use secrecy::SecretString;
use serde::Serialize;

pub use huestream_api::Rgb;

use crate::error::CoreError;

/// A bridge found by discovery. Only meaningful during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDevice {
    pub id: String,
    pub address: Ipv4Addr,
    pub port: Option<u16>,
}

/// Long-lived bridge credentials plus the address they were issued by.
///
/// Never mutated; replaced wholesale after a new registration. `Debug`
/// output keeps both secrets redacted.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Bridge address as entered or persisted; validated by
    /// [`ConnectionManager::init`](crate::ConnectionManager::init).
    pub address: String,
    /// Application key sent as `hue-application-key` on REST calls.
    pub username: SecretString,
    /// 32 hex characters; the DTLS pre-shared key once decoded.
    pub client_key: SecretString,
}

impl Credentials {
    /// Parse [`address`](Self::address) as an IPv4 literal.
    ///
    /// Hostnames are rejected outright: bridges rarely have stable DNS
    /// names, and the streaming socket must target the literal address.
    pub fn ipv4(&self) -> Result<Ipv4Addr, CoreError> {
        parse_ipv4(&self.address)
    }
}

pub(crate) fn parse_ipv4(address: &str) -> Result<Ipv4Addr, CoreError> {
    address
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| CoreError::InvalidAddress {
            address: address.to_owned(),
        })
}

/// Reference to a bridge resource (usually a light's entertainment service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    pub rid: String,
    pub rtype: String,
}

/// One streaming channel of an entertainment area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub index: u8,
    pub members: Vec<ResourceRef>,
}

/// A named, ordered group of channels configured for streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntertainmentArea {
    pub id: String,
    pub name: String,
    pub configuration_type: Option<String>,
    /// `true` while some client is streaming to this area.
    pub active: bool,
    /// Sorted by channel index.
    pub channels: Vec<Channel>,
}

impl EntertainmentArea {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Per-channel colors in channel-index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorBuffer {
    colors: Vec<Rgb>,
}

impl ColorBuffer {
    /// A buffer of `channels` black entries.
    pub fn zeroed(channels: usize) -> Self {
        Self {
            colors: vec![Rgb::BLACK; channels],
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn as_slice(&self) -> &[Rgb] {
        &self.colors
    }

    /// Overwrite every entry; `colors` must match the buffer length.
    pub fn copy_from(&mut self, colors: &[Rgb]) -> Result<(), CoreError> {
        if colors.len() != self.colors.len() {
            return Err(CoreError::ChannelCountMismatch {
                expected: self.colors.len(),
                actual: colors.len(),
            });
        }
        self.colors.copy_from_slice(colors);
        Ok(())
    }

    pub fn set(&mut self, index: usize, color: Rgb) -> Result<(), CoreError> {
        let channels = self.colors.len();
        let slot = self
            .colors
            .get_mut(index)
            .ok_or(CoreError::ChannelOutOfRange { index, channels })?;
        *slot = color;
        Ok(())
    }

    pub fn fill(&mut self, color: Rgb) {
        self.colors.fill(color);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hostnames_are_not_addresses() {
        let creds = Credentials {
            address: "hue-bridge.local".into(),
            username: SecretString::from("u".to_string()),
            client_key: SecretString::from("k".to_string()),
        };
        assert!(matches!(creds.ipv4(), Err(CoreError::InvalidAddress { .. })));
        assert!(parse_ipv4("10.0.0.256").is_err());
        assert!(parse_ipv4("::1").is_err());
        assert_eq!(parse_ipv4(" 10.0.0.5 ").unwrap(), Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn buffer_rejects_wrong_lengths() {
        let mut buffer = ColorBuffer::zeroed(3);
        let err = buffer.copy_from(&[Rgb::new(1, 2, 3)]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ChannelCountMismatch {
                expected: 3,
                actual: 1
            }
        ));
        assert!(matches!(
            buffer.set(3, Rgb::BLACK),
            Err(CoreError::ChannelOutOfRange { index: 3, channels: 3 })
        ));
    }

    #[test]
    fn fill_and_set_write_in_place() {
        let mut buffer = ColorBuffer::zeroed(2);
        buffer.fill(Rgb::new(9, 9, 9));
        buffer.set(1, Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(buffer.as_slice(), &[Rgb::new(9, 9, 9), Rgb::new(1, 2, 3)]);
    }
}
