//! Async client for the Hue bridge surfaces an entertainment streamer needs.
//!
//! - **[`DiscoveryClient`]** queries the cloud discovery endpoint.
//! - **[`BridgeClient`]** talks to one bridge: registration, application id
//!   lookup, entertainment configuration listing and activation.
//! - **[`stream`]** holds the frame codec and the DTLS-PSK channel to the
//!   bridge's UDP streaming port.
//!
//! Lifecycle policy (when to activate, reconnect, or give up) lives in
//! `huestream-core`; this crate only performs single operations.

pub mod auth;
pub mod bridge;
pub mod discovery;
pub mod error;
pub mod stream;
pub mod transport;

pub use auth::{BridgeCredentials, PskCredentials};
pub use bridge::BridgeClient;
pub use bridge::models::{ChannelMember, EntertainmentChannel, EntertainmentConfiguration};
pub use discovery::{DEFAULT_DISCOVERY_URL, DiscoveredBridge, DiscoveryClient};
pub use error::Error;
pub use stream::{DtlsStream, FrameEncoder, Rgb, STREAM_PORT, StreamOptions};
pub use transport::{TlsMode, TransportConfig};
