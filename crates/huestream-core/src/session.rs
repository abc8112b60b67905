// ── Streaming session ──
//
// One encrypted datagram connection to one bridge for one entertainment
// area. The session owns its state machine; callers drive it through
// `start`, `send`, and `stop` and never set the state directly.

use std::sync::Arc;

use huestream_api::FrameEncoder;
use huestream_api::auth::redact;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{EntertainmentBridge, FrameChannel};
use crate::error::CoreError;
use crate::model::{EntertainmentArea, Rgb};

/// Lifecycle of a [`StreamingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Activating,
    Handshaking,
    Streaming,
    Stopping,
}

/// A single streaming connection for one area.
pub struct StreamingSession {
    bridge: Arc<dyn EntertainmentBridge>,
    area_id: String,
    channels: usize,
    state: SessionState,
    channel: Option<Box<dyn FrameChannel>>,
    encoder: FrameEncoder,
}

impl StreamingSession {
    pub fn new(bridge: Arc<dyn EntertainmentBridge>, area: &EntertainmentArea) -> Self {
        Self {
            bridge,
            area_id: area.id.clone(),
            channels: area.channel_count(),
            state: SessionState::Disconnected,
            channel: None,
            encoder: FrameEncoder::with_channels(area.channel_count()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn area_id(&self) -> &str {
        &self.area_id
    }

    /// Activate the area, then run the handshake straight away.
    ///
    /// The bridge only opens its streaming port while the area is active,
    /// so there is no pause between the two steps. On handshake failure the
    /// area is deactivated again (best effort) and the session returns to
    /// `Disconnected`. Cancelling `cancel` aborts whichever step is running.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<(), CoreError> {
        if self.state != SessionState::Disconnected {
            return Err(CoreError::Internal(format!(
                "session for area {} cannot start while {}",
                self.area_id, self.state
            )));
        }

        self.state = SessionState::Activating;
        debug!(area_id = %self.area_id, "activating entertainment area");
        let activation = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::Cancelled),
            res = self.bridge.set_area_active(&self.area_id, true) => res.map_err(|e| {
                CoreError::ActivationFailed {
                    area_id: self.area_id.clone(),
                    reason: e.to_string(),
                }
            }),
        };
        if let Err(e) = activation {
            if matches!(e, CoreError::Cancelled) {
                // The PUT may have landed before it was dropped.
                self.deactivate().await;
            }
            self.state = SessionState::Disconnected;
            return Err(e);
        }

        self.state = SessionState::Handshaking;
        let identity = self.psk_identity().await;
        match self.bridge.open_channel(&identity, cancel).await {
            Ok(channel) => {
                self.channel = Some(channel);
                self.state = SessionState::Streaming;
                info!(area_id = %self.area_id, channels = self.channels, "streaming started");
                Ok(())
            }
            Err(e) => {
                warn!(area_id = %self.area_id, error = %e, "handshake failed");
                self.deactivate().await;
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Encode and queue one frame.
    ///
    /// Never waits on the network. A channel failure is reported as
    /// [`CoreError::TransmissionFailed`] and the session stays `Streaming`
    /// until stopped.
    pub fn send(&mut self, colors: &[Rgb]) -> Result<(), CoreError> {
        if self.state != SessionState::Streaming {
            return Err(CoreError::NotConnected);
        }
        let Some(channel) = self.channel.as_mut() else {
            return Err(CoreError::NotConnected);
        };
        debug_assert_eq!(
            colors.len(),
            self.channels,
            "color count must match the area's channel count"
        );

        let frame = self.encoder.encode(&self.area_id, colors);
        channel.send_frame(frame).map_err(|e| match e {
            CoreError::TransmissionFailed { .. } => e,
            other => CoreError::TransmissionFailed {
                reason: other.to_string(),
            },
        })
    }

    /// Close the channel and deactivate the area.
    ///
    /// Deactivation failures are logged, not returned. Safe in any state.
    pub async fn stop(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.state = SessionState::Stopping;
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.deactivate().await;
        self.state = SessionState::Disconnected;
        info!(area_id = %self.area_id, "streaming stopped");
    }

    async fn psk_identity(&self) -> String {
        match self.bridge.application_id().await {
            Ok(Some(id)) => id,
            outcome => {
                let username = self.bridge.username().expose_secret();
                match outcome {
                    Err(e) => warn!(
                        error = %e,
                        identity = %redact(username),
                        "application id lookup failed, using username as PSK identity"
                    ),
                    _ => warn!(
                        identity = %redact(username),
                        "bridge reported no application id, using username as PSK identity"
                    ),
                }
                username.to_owned()
            }
        }
    }

    async fn deactivate(&self) {
        if let Err(e) = self.bridge.set_area_active(&self.area_id, false).await {
            warn!(area_id = %self.area_id, error = %e, "failed to deactivate entertainment area");
        }
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("area_id", &self.area_id)
            .field("channels", &self.channels)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::*;
    use crate::model::Channel;

    struct FakeBridge {
        username: SecretString,
        app_id: Option<String>,
        fail_activation: bool,
        fail_handshake: bool,
        fail_send: bool,
        activations: Mutex<Vec<bool>>,
        identities: Mutex<Vec<String>>,
        frames: Arc<AtomicUsize>,
    }

    struct FakeChannel {
        fail: bool,
        frames: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FrameChannel for FakeChannel {
        fn send_frame(&mut self, frame: &[u8]) -> Result<(), CoreError> {
            if self.fail {
                return Err(CoreError::TransmissionFailed {
                    reason: "peer gone".into(),
                });
            }
            assert_eq!(frame.len(), huestream_api::stream::codec::frame_len(2));
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&mut self) {}
    }

    #[async_trait]
    impl EntertainmentBridge for FakeBridge {
        fn username(&self) -> &SecretString {
            &self.username
        }

        async fn application_id(&self) -> Result<Option<String>, CoreError> {
            Ok(self.app_id.clone())
        }

        async fn set_area_active(&self, _area_id: &str, active: bool) -> Result<(), CoreError> {
            self.activations.lock().unwrap().push(active);
            if active && self.fail_activation {
                return Err(CoreError::Bridge {
                    message: "nope".into(),
                    status: Some(500),
                });
            }
            Ok(())
        }

        async fn list_areas(&self) -> Result<Vec<EntertainmentArea>, CoreError> {
            Ok(vec![])
        }

        async fn open_channel(
            &self,
            identity: &str,
            _cancel: &CancellationToken,
        ) -> Result<Box<dyn FrameChannel>, CoreError> {
            self.identities.lock().unwrap().push(identity.to_owned());
            if self.fail_handshake {
                return Err(CoreError::HandshakeTimeout { timeout_ms: 5000 });
            }
            Ok(Box::new(FakeChannel {
                fail: self.fail_send,
                frames: Arc::clone(&self.frames),
            }))
        }
    }

    fn area() -> EntertainmentArea {
        EntertainmentArea {
            id: "1a8d99cc-967b-44f2-9202-43f976c0fa6b".into(),
            name: "Desk".into(),
            configuration_type: None,
            active: false,
            channels: (0..2)
                .map(|index| Channel {
                    index,
                    members: vec![],
                })
                .collect(),
        }
    }

    fn bridge(configure: impl FnOnce(&mut FakeBridge)) -> Arc<FakeBridge> {
        let mut fake = FakeBridge {
            username: SecretString::from("user-1234".to_string()),
            app_id: Some("app-id".into()),
            fail_activation: false,
            fail_handshake: false,
            fail_send: false,
            activations: Mutex::new(Vec::new()),
            identities: Mutex::new(Vec::new()),
            frames: Arc::new(AtomicUsize::new(0)),
        };
        configure(&mut fake);
        Arc::new(fake)
    }

    const COLORS: [Rgb; 2] = [Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)];

    #[tokio::test]
    async fn send_requires_streaming_state() {
        let fake = bridge(|_| {});
        let mut session = StreamingSession::new(fake, &area());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(session.send(&COLORS), Err(CoreError::NotConnected)));
    }

    #[tokio::test]
    async fn start_send_stop_round_trip() {
        let fake = bridge(|_| {});
        let mut session = StreamingSession::new(fake.clone(), &area());

        session.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(session.state(), SessionState::Streaming);
        session.send(&COLORS).unwrap();
        session.send(&COLORS).unwrap();
        assert_eq!(fake.frames.load(Ordering::SeqCst), 2);
        assert_eq!(fake.identities.lock().unwrap().as_slice(), ["app-id"]);

        session.stop().await;
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(session.send(&COLORS), Err(CoreError::NotConnected)));
        assert_eq!(fake.activations.lock().unwrap().as_slice(), [true, false]);
    }

    #[tokio::test]
    async fn activation_failure_leaves_session_disconnected() {
        let fake = bridge(|b| b.fail_activation = true);
        let mut session = StreamingSession::new(fake.clone(), &area());

        let err = session.start(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::ActivationFailed { .. }));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(fake.identities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handshake_failure_deactivates_area() {
        let fake = bridge(|b| b.fail_handshake = true);
        let mut session = StreamingSession::new(fake.clone(), &area());

        let err = session.start(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::HandshakeTimeout { timeout_ms: 5000 }));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(fake.activations.lock().unwrap().as_slice(), [true, false]);
    }

    #[tokio::test]
    async fn missing_application_id_falls_back_to_username() {
        let fake = bridge(|b| b.app_id = None);
        let mut session = StreamingSession::new(fake.clone(), &area());

        session.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(fake.identities.lock().unwrap().as_slice(), ["user-1234"]);
    }

    #[tokio::test]
    async fn send_failure_keeps_session_streaming() {
        let fake = bridge(|b| b.fail_send = true);
        let mut session = StreamingSession::new(fake, &area());

        session.start(&CancellationToken::new()).await.unwrap();
        let err = session.send(&COLORS).unwrap_err();
        assert!(matches!(err, CoreError::TransmissionFailed { .. }));
        assert_eq!(session.state(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let fake = bridge(|_| {});
        let mut session = StreamingSession::new(fake.clone(), &area());

        session.start(&CancellationToken::new()).await.unwrap();
        assert!(session.start(&CancellationToken::new()).await.is_err());
        assert_eq!(fake.identities.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_start_does_not_handshake() {
        let fake = bridge(|_| {});
        let mut session = StreamingSession::new(fake.clone(), &area());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = session.start(&cancel).await.unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
        assert!(fake.identities.lock().unwrap().is_empty());
        // Best-effort deactivation after an interrupted activation.
        assert_eq!(fake.activations.lock().unwrap().as_slice(), [false]);
    }
}
