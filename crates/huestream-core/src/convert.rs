// ── Wire → domain conversions ──

use std::net::Ipv4Addr;

use huestream_api::{BridgeCredentials, DiscoveredBridge, EntertainmentConfiguration};
use tracing::debug;

use crate::model::{BridgeDevice, Channel, Credentials, EntertainmentArea, ResourceRef};

impl From<EntertainmentConfiguration> for EntertainmentArea {
    fn from(cfg: EntertainmentConfiguration) -> Self {
        let mut channels: Vec<Channel> = cfg
            .channels
            .into_iter()
            .map(|ch| Channel {
                index: ch.channel_id,
                members: ch
                    .members
                    .into_iter()
                    .map(|m| ResourceRef {
                        rid: m.service.rid,
                        rtype: m.service.rtype,
                    })
                    .collect(),
            })
            .collect();
        channels.sort_by_key(|ch| ch.index);

        Self {
            id: cfg.id,
            name: cfg.metadata.name,
            configuration_type: cfg.configuration_type,
            active: cfg.status.as_deref() == Some("active"),
            channels,
        }
    }
}

/// Keep only bridges that report an IPv4 address.
pub(crate) fn bridge_device(raw: DiscoveredBridge) -> Option<BridgeDevice> {
    match raw.internal_ip_address.parse::<Ipv4Addr>() {
        Ok(address) => Some(BridgeDevice {
            id: raw.id,
            address,
            port: raw.port,
        }),
        Err(_) => {
            debug!(id = %raw.id, address = %raw.internal_ip_address, "skipping non-IPv4 bridge");
            None
        }
    }
}

pub(crate) fn credentials(address: &str, issued: BridgeCredentials) -> Credentials {
    Credentials {
        address: address.to_owned(),
        username: issued.username,
        client_key: issued.client_key,
    }
}
