// Wire types for the bridge's JSON APIs.
//
// The resource API (`/clip/v2`) wraps payloads as `{ errors: [], data: [] }`.
// Registration still goes through the older `/api` endpoint, which answers
// with an array of `{ success }` / `{ error }` objects.

use serde::{Deserialize, Serialize};

/// Envelope of every `/clip/v2` response.
#[derive(Debug, Deserialize)]
pub struct ClipResponse<T> {
    #[serde(default)]
    pub errors: Vec<ClipError>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipError {
    pub description: String,
}

/// Reference to another resource on the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub rid: String,
    pub rtype: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigurationMetadata {
    #[serde(default)]
    pub name: String,
}

/// One channel member: a light's entertainment service plus the segment index.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMember {
    pub service: ResourceIdentifier,
    #[serde(default)]
    pub index: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntertainmentChannel {
    pub channel_id: u8,
    #[serde(default)]
    pub members: Vec<ChannelMember>,
}

/// `entertainment_configuration` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct EntertainmentConfiguration {
    pub id: String,
    #[serde(default)]
    pub metadata: ConfigurationMetadata,
    #[serde(default)]
    pub configuration_type: Option<String>,
    /// `"active"` while some client is streaming to the area.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub channels: Vec<EntertainmentChannel>,
}

/// Body of the activation PUT.
#[derive(Debug, Serialize)]
pub(crate) struct StreamingAction {
    pub action: &'static str,
}

// ── Registration ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationRequest<'a> {
    pub devicetype: &'a str,
    pub generateclientkey: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationItem {
    pub success: Option<RegistrationSuccess>,
    pub error: Option<RegistrationError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationSuccess {
    pub username: String,
    #[serde(default)]
    pub clientkey: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationError {
    #[serde(rename = "type")]
    pub error_type: u16,
    #[serde(default)]
    pub description: String,
}

/// Bridge error type for "link button not pressed".
pub(crate) const LINK_BUTTON_NOT_PRESSED: u16 = 101;
