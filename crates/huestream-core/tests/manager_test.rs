#![allow(clippy::unwrap_used)]
// Lifecycle tests for `ConnectionManager` against an in-process bridge.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use huestream_core::{
    BridgeConnector, Channel, ConnectionManager, CoreError, Credentials, EntertainmentArea,
    EntertainmentBridge, ErrorKind, FrameChannel, ManagerConfig, Rgb, StreamState, UpdateOutcome,
};

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeBridge {
    opens: AtomicUsize,
    frames: Arc<AtomicUsize>,
    fail_send: AtomicBool,
    fail_open: AtomicBool,
    hang_open: AtomicBool,
    slow_deactivate: AtomicBool,
    activations: Mutex<Vec<(String, bool)>>,
    closes: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeBridge {
    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

struct FakeChannel {
    fail: bool,
    frames: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl FrameChannel for FakeChannel {
    fn send_frame(&mut self, _frame: &[u8]) -> Result<(), CoreError> {
        if self.fail {
            return Err(CoreError::TransmissionFailed {
                reason: "writer stopped".into(),
            });
        }
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push("close");
    }
}

static USERNAME: std::sync::LazyLock<SecretString> =
    std::sync::LazyLock::new(|| SecretString::from("user-1".to_string()));

#[async_trait]
impl EntertainmentBridge for FakeBridge {
    fn username(&self) -> &SecretString {
        &USERNAME
    }

    async fn application_id(&self) -> Result<Option<String>, CoreError> {
        Ok(Some("app-1".into()))
    }

    async fn set_area_active(&self, area_id: &str, active: bool) -> Result<(), CoreError> {
        if !active && self.slow_deactivate.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.activations
            .lock()
            .unwrap()
            .push((area_id.to_owned(), active));
        self.calls
            .lock()
            .unwrap()
            .push(if active { "active=true" } else { "active=false" });
        Ok(())
    }

    async fn list_areas(&self) -> Result<Vec<EntertainmentArea>, CoreError> {
        Ok(vec![area("a", 5), area("b", 3)])
    }

    async fn open_channel(
        &self,
        _identity: &str,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn FrameChannel>, CoreError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push("open");
        if self.hang_open.load(Ordering::SeqCst) {
            cancel.cancelled().await;
            return Err(CoreError::Cancelled);
        }
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(CoreError::HandshakeFailed {
                reason: "alert: decrypt_error".into(),
            });
        }
        Ok(Box::new(FakeChannel {
            fail: self.fail_send.load(Ordering::SeqCst),
            frames: Arc::clone(&self.frames),
            closes: Arc::clone(&self.closes),
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct FakeConnector {
    bridge: Arc<FakeBridge>,
    connects: AtomicUsize,
}

impl BridgeConnector for FakeConnector {
    fn connect(
        &self,
        _address: Ipv4Addr,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn EntertainmentBridge>, CoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.bridge.clone())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn area(id: &str, channels: u8) -> EntertainmentArea {
    EntertainmentArea {
        id: id.into(),
        name: format!("Area {id}"),
        configuration_type: Some("screen".into()),
        active: false,
        channels: (0..channels)
            .map(|index| Channel {
                index,
                members: vec![],
            })
            .collect(),
    }
}

fn credentials(address: &str) -> Credentials {
    Credentials {
        address: address.into(),
        username: SecretString::from("user-1".to_string()),
        client_key: SecretString::from("00112233445566778899aabbccddeeff".to_string()),
    }
}

fn setup() -> (ConnectionManager, Arc<FakeBridge>, Arc<FakeConnector>) {
    let bridge = Arc::new(FakeBridge::default());
    let connector = Arc::new(FakeConnector {
        bridge: Arc::clone(&bridge),
        connects: AtomicUsize::new(0),
    });
    let manager = ConnectionManager::with_connector(ManagerConfig::default(), connector.clone());
    (manager, bridge, connector)
}

async fn streaming(channels: u8) -> (ConnectionManager, Arc<FakeBridge>) {
    let (manager, bridge, _) = setup();
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", channels)).await;
    manager.start().await.unwrap();
    (manager, bridge)
}

// ── Init ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_init_rejects_hostnames() {
    let (manager, _, connector) = setup();

    let err = manager.init(&credentials("hue-bridge.local")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAddress);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_start_requires_init() {
    let (manager, _, _) = setup();
    manager.set_area(area("a", 2)).await;

    let err = manager.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotInitialized);
}

#[tokio::test]
async fn test_start_without_area_is_noop() {
    let (manager, bridge, _) = setup();
    manager.init(&credentials("10.0.0.5")).await.unwrap();

    manager.start().await.unwrap();
    assert!(!manager.is_streaming_active());
    assert_eq!(bridge.opens.load(Ordering::SeqCst), 0);
}

// ── Session lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn test_double_start_creates_one_session() {
    let (manager, bridge) = streaming(3).await;

    manager.start().await.unwrap();
    assert!(manager.is_streaming_active());
    assert_eq!(bridge.opens.load(Ordering::SeqCst), 1);
    assert_eq!(*manager.state().borrow(), StreamState::Streaming);
}

#[tokio::test]
async fn test_update_sends_frames_in_order() {
    let (manager, bridge) = streaming(3).await;

    manager.fill(Rgb::new(10, 20, 30));
    assert_eq!(manager.update(), UpdateOutcome::Sent);
    assert_eq!(manager.update(), UpdateOutcome::Sent);
    assert_eq!(bridge.frames.load(Ordering::SeqCst), 2);

    manager.set_enabled(false);
    assert_eq!(manager.update(), UpdateOutcome::Skipped);
    assert_eq!(bridge.frames.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_update_before_start_is_skipped() {
    let (manager, bridge, _) = setup();
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;

    assert_eq!(manager.update(), UpdateOutcome::Skipped);
    assert_eq!(bridge.frames.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_start_returns_to_idle() {
    let (manager, bridge, _) = setup();
    bridge.fail_open.store(true, Ordering::SeqCst);
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;

    let err = manager.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandshakeFailed);
    assert!(!manager.is_streaming_active());
    assert_eq!(*manager.state().borrow(), StreamState::Idle);
    // activated, then best-effort deactivated
    assert_eq!(
        bridge.activations.lock().unwrap().clone(),
        vec![("a".to_string(), true), ("a".to_string(), false)]
    );
}

#[tokio::test]
async fn test_stop_cancels_inflight_handshake() {
    let (manager, bridge, _) = setup();
    bridge.hang_open.store(true, Ordering::SeqCst);
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;

    let mut state = manager.state();
    let starter = tokio::spawn({
        let manager = manager.clone();
        async move { manager.start().await }
    });
    state
        .wait_for(|s| *s == StreamState::Starting)
        .await
        .unwrap();
    while bridge.opens.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    manager.stop().await;
    // The cancelled start has already deactivated the area.
    assert_eq!(bridge.calls(), vec!["active=true", "open", "active=false"]);
    let result = starter.await.unwrap();
    assert!(matches!(result, Err(CoreError::Cancelled)));
    assert!(!manager.is_streaming_active());
    assert_eq!(*manager.state().borrow(), StreamState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_start_waits_for_previous_session_to_stop() {
    let (manager, bridge) = streaming(2).await;
    bridge.slow_deactivate.store(true, Ordering::SeqCst);

    let mut state = manager.state();
    let stopper = tokio::spawn({
        let manager = manager.clone();
        async move { manager.stop().await }
    });
    state.wait_for(|s| *s == StreamState::Idle).await.unwrap();

    manager.start().await.unwrap();
    stopper.await.unwrap();

    assert_eq!(
        bridge.calls(),
        vec!["active=true", "open", "close", "active=false", "active=true", "open"]
    );
    assert!(manager.is_streaming_active());
    assert_eq!(bridge.opens.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_returns_after_channel_closed() {
    let (manager, bridge) = streaming(2).await;
    bridge.slow_deactivate.store(true, Ordering::SeqCst);

    manager.stop().await;
    assert_eq!(bridge.closes.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.calls().last(), Some(&"active=false"));
    assert_eq!(*manager.state().borrow(), StreamState::Idle);
}

// ── Reconnect policy ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_reconnect_is_bounded_to_one_attempt() {
    let (manager, bridge, _) = setup();
    bridge.fail_send.store(true, Ordering::SeqCst);
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;
    manager.start().await.unwrap();
    // Every later handshake fails.
    bridge.fail_open.store(true, Ordering::SeqCst);
    let opens_before = bridge.opens.load(Ordering::SeqCst);

    let mut errors = manager.errors();
    let mut state = manager.state();
    let started = tokio::time::Instant::now();

    assert_eq!(manager.update(), UpdateOutcome::ReconnectScheduled);
    assert!(manager.is_reconnecting());
    assert_eq!(manager.update(), UpdateOutcome::Skipped);
    manager.start().await.unwrap(); // no-op while reconnecting

    state.wait_for(|s| *s == StreamState::Idle).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(!manager.is_reconnecting());
    assert_eq!(bridge.opens.load(Ordering::SeqCst), opens_before + 1);

    let report = errors.recv().await.unwrap();
    assert_eq!(report.kind, ErrorKind::HandshakeFailed);

    // Nothing else is scheduled.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(manager.update(), UpdateOutcome::Skipped);
    assert_eq!(bridge.opens.load(Ordering::SeqCst), opens_before + 1);
    assert!(errors.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_restores_streaming() {
    let (manager, bridge, _) = setup();
    bridge.fail_send.store(true, Ordering::SeqCst);
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;
    manager.start().await.unwrap();

    let mut state = manager.state();
    assert_eq!(manager.update(), UpdateOutcome::ReconnectScheduled);
    bridge.fail_send.store(false, Ordering::SeqCst);

    state
        .wait_for(|s| *s == StreamState::Streaming)
        .await
        .unwrap();
    assert_eq!(bridge.opens.load(Ordering::SeqCst), 2);
    assert_eq!(manager.update(), UpdateOutcome::Sent);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_reconnect() {
    let (manager, bridge, _) = setup();
    bridge.fail_send.store(true, Ordering::SeqCst);
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;
    manager.start().await.unwrap();

    assert_eq!(manager.update(), UpdateOutcome::ReconnectScheduled);
    manager.stop().await;
    assert!(!manager.is_reconnecting());
    assert_eq!(bridge.closes.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(bridge.opens.load(Ordering::SeqCst), 1);
    assert!(!manager.is_streaming_active());
    assert_eq!(bridge.calls(), vec!["active=true", "open", "close", "active=false"]);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_during_pending_reconnect_releases_channel() {
    let (manager, bridge, _) = setup();
    bridge.fail_send.store(true, Ordering::SeqCst);
    bridge.slow_deactivate.store(true, Ordering::SeqCst);
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;
    manager.start().await.unwrap();

    assert_eq!(manager.update(), UpdateOutcome::ReconnectScheduled);
    manager.dispose().await;

    assert_eq!(bridge.closes.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.calls(), vec!["active=true", "open", "close", "active=false"]);
    assert!(!manager.is_reconnecting());
    assert_eq!(*manager.state().borrow(), StreamState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_reconnect_handshake_deactivates_area() {
    let (manager, bridge, _) = setup();
    bridge.fail_send.store(true, Ordering::SeqCst);
    manager.init(&credentials("10.0.0.5")).await.unwrap();
    manager.set_area(area("a", 2)).await;
    manager.start().await.unwrap();
    bridge.hang_open.store(true, Ordering::SeqCst);

    assert_eq!(manager.update(), UpdateOutcome::ReconnectScheduled);
    while bridge.opens.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    manager.stop().await;
    assert_eq!(
        bridge.calls(),
        vec![
            "active=true",
            "open",
            "close",
            "active=false",
            "active=true",
            "open",
            "active=false",
        ]
    );
    assert_eq!(bridge.closes.load(Ordering::SeqCst), 1);
    assert!(!manager.is_reconnecting());
}

// ── Area and colors ─────────────────────────────────────────────────

#[tokio::test]
async fn test_area_switch_resets_buffer() {
    let (manager, _, _) = setup();

    manager.set_area(area("a", 5)).await;
    manager.fill(Rgb::new(255, 255, 255));
    manager.set_area(area("b", 3)).await;

    assert_eq!(manager.colors(), vec![Rgb::BLACK; 3]);
    assert_eq!(manager.current_area().unwrap().id, "b");
}

#[tokio::test]
async fn test_area_switch_stops_without_restart() {
    let (manager, bridge) = streaming(5).await;

    manager.set_area(area("b", 3)).await;
    assert!(!manager.is_streaming_active());
    assert_eq!(bridge.opens.load(Ordering::SeqCst), 1);
    assert_eq!(manager.update(), UpdateOutcome::Skipped);

    manager.start().await.unwrap();
    assert!(manager.is_streaming_active());
    assert_eq!(bridge.opens.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_set_colors_checks_length() {
    let (manager, _, _) = setup();
    manager.set_area(area("a", 2)).await;

    let err = manager.set_colors(&[Rgb::BLACK]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChannelCountMismatch);

    manager
        .set_colors(&[Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)])
        .unwrap();
    manager.set_channel(0, Rgb::new(9, 9, 9)).unwrap();
    assert_eq!(manager.colors(), vec![Rgb::new(9, 9, 9), Rgb::new(4, 5, 6)]);
    assert_eq!(
        manager.set_channel(2, Rgb::BLACK).unwrap_err().kind(),
        ErrorKind::ChannelOutOfRange
    );
}

#[tokio::test]
async fn test_find_area_by_id() {
    let (manager, _, _) = setup();
    assert_eq!(
        manager.list_areas().await.unwrap_err().kind(),
        ErrorKind::NotInitialized
    );

    manager.init(&credentials("10.0.0.5")).await.unwrap();
    let found = manager.find_area("b").await.unwrap().unwrap();
    assert_eq!(found.channel_count(), 3);
    assert!(manager.find_area("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_dispose_is_idempotent() {
    let (manager, bridge) = streaming(2).await;

    manager.dispose().await;
    assert_eq!(bridge.closes.load(Ordering::SeqCst), 1);
    manager.dispose().await;

    assert_eq!(bridge.closes.load(Ordering::SeqCst), 1);
    assert!(!manager.is_streaming_active());
    assert!(manager.current_area().is_none());
    assert!(manager.colors().is_empty());
    assert_eq!(
        bridge.activations.lock().unwrap().clone(),
        vec![("a".to_string(), true), ("a".to_string(), false)]
    );
    assert_eq!(manager.start().await.unwrap_err().kind(), ErrorKind::NotInitialized);
}
