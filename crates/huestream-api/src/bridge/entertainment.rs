// Entertainment endpoints
//
// The handful of resource calls a streaming session needs: listing
// entertainment configurations, toggling streaming on one, and fetching
// the application id used as the DTLS PSK identity.

use tracing::debug;

use crate::auth::APPLICATION_ID_HEADER;
use crate::bridge::client::BridgeClient;
use crate::bridge::models::{EntertainmentConfiguration, ResourceIdentifier, StreamingAction};
use crate::error::Error;

impl BridgeClient {
    /// Fetch the bridge-issued application id for the current key.
    ///
    /// `GET /auth/v1`; the id comes back in the `hue-application-id`
    /// response header. Returns `Ok(None)` when the bridge answers without
    /// the header (older firmware).
    pub async fn application_id(&self) -> Result<Option<String>, Error> {
        let url = self.url("auth/v1")?;
        debug!("GET {}", url);

        let resp = self.http().get(url).send().await.map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Unauthorized);
        }
        if !status.is_success() {
            return Err(Error::Bridge {
                message: "application id lookup failed".into(),
                status: status.as_u16(),
            });
        }

        Ok(resp
            .headers()
            .get(APPLICATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from))
    }

    /// List all entertainment configurations.
    ///
    /// `GET /clip/v2/resource/entertainment_configuration`
    pub async fn list_entertainment_configurations(
        &self,
    ) -> Result<Vec<EntertainmentConfiguration>, Error> {
        let url = self.resource_url("entertainment_configuration")?;
        debug!("listing entertainment configurations");
        self.get(url).await
    }

    /// Start or stop streaming mode on an entertainment configuration.
    ///
    /// `PUT /clip/v2/resource/entertainment_configuration/{id}` with
    /// `{"action": "start"}` or `{"action": "stop"}`. The bridge opens its
    /// DTLS port only while the configuration is active.
    pub async fn set_streaming(&self, id: &str, active: bool) -> Result<(), Error> {
        let url = self.resource_url(&format!("entertainment_configuration/{id}"))?;
        let action = if active { "start" } else { "stop" };
        debug!(area_id = id, action, "toggling entertainment streaming");
        let _: Vec<ResourceIdentifier> = self.put(url, &StreamingAction { action }).await?;
        Ok(())
    }
}
