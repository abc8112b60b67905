// Bridge registration
//
// Exchanges a device label for a username + client key. The bridge only
// grants credentials within ~30 seconds of its physical link button being
// pressed; outside that window it answers with error type 101.

use secrecy::SecretString;
use tracing::debug;

use crate::auth::BridgeCredentials;
use crate::bridge::client::BridgeClient;
use crate::bridge::models::{LINK_BUTTON_NOT_PRESSED, RegistrationItem, RegistrationRequest};
use crate::error::{Error, preview};

impl BridgeClient {
    /// Attempt registration once.
    ///
    /// `POST /api` with `{"devicetype": label, "generateclientkey": true}`.
    ///
    /// Returns [`Error::LinkButtonNotPressed`] while the pairing window is
    /// closed and [`Error::RegistrationRejected`] for every other
    /// bridge-reported error. Never loops: retry policy belongs to the
    /// caller.
    pub async fn register(&self, device_label: &str) -> Result<BridgeCredentials, Error> {
        let url = self.url("api")?;
        debug!(device_label, "POST {}", url);

        let resp = self
            .http()
            .post(url)
            .json(&RegistrationRequest {
                devicetype: device_label,
                generateclientkey: true,
            })
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::RegistrationRejected {
                error_type: status.as_u16(),
                description: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let items: Vec<RegistrationItem> =
            serde_json::from_str(&body).map_err(|e| Error::deserialization(&e, &body))?;

        for item in items {
            if let Some(err) = item.error {
                return Err(if err.error_type == LINK_BUTTON_NOT_PRESSED {
                    Error::LinkButtonNotPressed
                } else {
                    Error::RegistrationRejected {
                        error_type: err.error_type,
                        description: err.description,
                    }
                });
            }

            if let Some(success) = item.success {
                let Some(client_key) = success.clientkey else {
                    return Err(Error::RegistrationRejected {
                        error_type: 0,
                        description: "bridge did not issue a client key (firmware too old?)"
                            .into(),
                    });
                };
                debug!("registration successful");
                return Ok(BridgeCredentials {
                    username: SecretString::from(success.username),
                    client_key: SecretString::from(client_key),
                });
            }
        }

        Err(Error::Deserialization {
            message: "registration response contained neither success nor error".into(),
            body,
        })
    }
}
