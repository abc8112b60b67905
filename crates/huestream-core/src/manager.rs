// ── Connection manager ──
//
// Orchestration above `StreamingSession`: the enabled flag, the selected
// area and its color buffer, the at-most-one-session rule, and the single
// automatic reconnect after a transmission failure.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{BridgeConnector, EntertainmentBridge, HueConnector};
use crate::config::ManagerConfig;
use crate::error::{CoreError, ErrorKind};
use crate::model::{BridgeDevice, ColorBuffer, Credentials, EntertainmentArea, Rgb};
use crate::session::StreamingSession;
use crate::setup::{self, RetryPolicy};

const ERROR_CHANNEL_SIZE: usize = 32;

// ── Observable state ─────────────────────────────────────────────

/// Streaming state observable by host applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamState {
    Idle,
    Starting,
    Streaming,
    Reconnecting,
}

/// A failure delivered to the error sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CoreError> for ErrorReport {
    fn from(err: &CoreError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What a call to [`ConnectionManager::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A frame was queued.
    Sent,
    /// Nothing to do: disabled, not started, or a reconnect is pending.
    Skipped,
    /// The frame failed and the single reconnect attempt was scheduled.
    ReconnectScheduled,
}

// ── ConnectionManager ────────────────────────────────────────────

/// Owns the streaming lifecycle for one bridge.
///
/// Cheaply cloneable via `Arc<ManagerInner>`. Construct once in the host
/// application and pass clones to collaborators.
///
/// The color buffer is meant to have one writer (the color source) feeding
/// one reader ([`update`](Self::update)); the internal lock only makes the
/// handle shareable across tasks.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ManagerConfig,
    connector: Arc<dyn BridgeConnector>,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<StreamState>,
    errors_tx: broadcast::Sender<ErrorReport>,
}

struct Shared {
    bridge: Option<Arc<dyn EntertainmentBridge>>,
    area: Option<EntertainmentArea>,
    colors: ColorBuffer,
    enabled: bool,
    lifecycle: Lifecycle,
    next_attempt: u64,
}

/// The session slot. `attempt` tags each start so a late-finishing start
/// or reconnect can tell whether it was superseded by `stop()`.
///
/// `settled` fires once the task driving a start or reconnect has released
/// everything it opened. `Stopping` holds the slot until the previous
/// occupant is fully torn down, so a new session never overlaps an old one.
enum Lifecycle {
    Idle,
    Starting {
        attempt: u64,
        cancel: CancellationToken,
        settled: CancellationToken,
    },
    Streaming {
        attempt: u64,
        session: StreamingSession,
    },
    Reconnecting {
        attempt: u64,
        cancel: CancellationToken,
        settled: CancellationToken,
    },
    Stopping {
        id: u64,
        settled: CancellationToken,
    },
}

impl Lifecycle {
    fn observed(&self) -> StreamState {
        match self {
            Self::Idle | Self::Stopping { .. } => StreamState::Idle,
            Self::Starting { .. } => StreamState::Starting,
            Self::Streaming { .. } => StreamState::Streaming,
            Self::Reconnecting { .. } => StreamState::Reconnecting,
        }
    }

    fn attempt(&self) -> Option<u64> {
        match self {
            Self::Idle | Self::Stopping { .. } => None,
            Self::Starting { attempt, .. }
            | Self::Streaming { attempt, .. }
            | Self::Reconnecting { attempt, .. } => Some(*attempt),
        }
    }
}

impl ConnectionManager {
    /// Create a manager that talks to real bridges. Does NOT connect:
    /// call [`init`](Self::init), [`set_area`](Self::set_area), then
    /// [`start`](Self::start).
    pub fn new(config: ManagerConfig) -> Self {
        let connector = Arc::new(HueConnector::new(config.clone()));
        Self::with_connector(config, connector)
    }

    /// Create a manager with a custom bridge backend.
    pub fn with_connector(config: ManagerConfig, connector: Arc<dyn BridgeConnector>) -> Self {
        let (state_tx, _) = watch::channel(StreamState::Idle);
        let (errors_tx, _) = broadcast::channel(ERROR_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ManagerInner {
                config,
                connector,
                shared: Mutex::new(Shared {
                    bridge: None,
                    area: None,
                    colors: ColorBuffer::default(),
                    enabled: true,
                    lifecycle: Lifecycle::Idle,
                    next_attempt: 0,
                }),
                state_tx,
                errors_tx,
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    // ── Setup ────────────────────────────────────────────────────

    /// Query the cloud discovery endpoint.
    pub async fn discover(&self) -> Result<Vec<BridgeDevice>, CoreError> {
        setup::discover(&self.inner.config).await
    }

    /// Single registration attempt against `address`.
    pub async fn register(&self, address: &str, label: &str) -> Result<Credentials, CoreError> {
        setup::register(&self.inner.config, address, label).await
    }

    /// Registration with the fixed-interval link button wait.
    pub async fn register_with_retry(
        &self,
        address: &str,
        label: &str,
        policy: &RetryPolicy,
        on_wait: impl FnMut(u32),
    ) -> Result<Credentials, CoreError> {
        setup::register_with_retry(&self.inner.config, address, label, policy, on_wait).await
    }

    /// Bind the manager to a bridge.
    ///
    /// Rejects anything but an IPv4 literal with
    /// [`CoreError::InvalidAddress`]. Any existing session is stopped first;
    /// the selected area and color buffer are kept.
    pub async fn init(&self, credentials: &Credentials) -> Result<(), CoreError> {
        let address = credentials.ipv4()?;
        self.stop().await;

        let bridge = self.inner.connector.connect(address, credentials)?;
        self.inner.shared.lock().bridge = Some(bridge);
        info!(%address, "connection manager initialized");
        Ok(())
    }

    /// Entertainment areas configured on the bridge.
    pub async fn list_areas(&self) -> Result<Vec<EntertainmentArea>, CoreError> {
        let bridge = self.bridge()?;
        bridge.list_areas().await
    }

    /// Look up one area by id.
    pub async fn find_area(&self, id: &str) -> Result<Option<EntertainmentArea>, CoreError> {
        Ok(self.list_areas().await?.into_iter().find(|a| a.id == id))
    }

    /// Select an area and reset the color buffer to its channel count.
    ///
    /// An active session is stopped and NOT restarted; call
    /// [`start`](Self::start) again to stream to the new area.
    pub async fn set_area(&self, area: EntertainmentArea) {
        debug!(area_id = %area.id, channels = area.channel_count(), "selecting area");
        self.stop_with(move |shared| {
            shared.colors = ColorBuffer::zeroed(area.channel_count());
            shared.area = Some(area);
        })
        .await;
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start streaming to the selected area.
    ///
    /// A no-op when already started, while a reconnect is pending, or with
    /// no area selected. A stop still tearing down the previous session is
    /// waited out first. On failure the manager returns to idle and the
    /// error is returned. A concurrent [`stop`](Self::stop) cancels an
    /// in-flight start, which then returns [`CoreError::Cancelled`].
    pub async fn start(&self) -> Result<(), CoreError> {
        let claim = loop {
            let stopping = {
                let mut shared = self.inner.shared.lock();
                let stopping = match &shared.lifecycle {
                    Lifecycle::Idle => None,
                    Lifecycle::Stopping { settled, .. } => Some(settled.clone()),
                    other => {
                        debug!(state = %other.observed(), "start ignored");
                        return Ok(());
                    }
                };
                match stopping {
                    Some(settled) => settled,
                    None => break self.claim(&mut shared)?,
                }
            };
            debug!("start waiting for the previous session to stop");
            stopping.cancelled().await;
        };
        let Some(Claim {
            bridge,
            area,
            attempt,
            cancel,
            settled,
        }) = claim
        else {
            debug!("start ignored: no area selected");
            return Ok(());
        };

        let _settled = settled.drop_guard();
        match self.establish(bridge, &area, attempt, &cancel).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.settle_idle(attempt);
                Err(e)
            }
        }
    }

    /// Send the current color buffer through the session.
    ///
    /// Call at the render cadence. Never waits. The first transmission
    /// failure schedules exactly one reconnect after
    /// [`ManagerConfig::reconnect_delay`]; calls made while it is pending
    /// are skipped. Must be called from within a Tokio runtime.
    pub fn update(&self) -> UpdateOutcome {
        let mut shared = self.inner.shared.lock();
        if !shared.enabled {
            return UpdateOutcome::Skipped;
        }

        let Shared {
            lifecycle, colors, ..
        } = &mut *shared;
        let Lifecycle::Streaming { session, .. } = lifecycle else {
            return UpdateOutcome::Skipped;
        };

        let err = match session.send(colors.as_slice()) {
            Ok(()) => return UpdateOutcome::Sent,
            Err(e) => e,
        };
        warn!(error = %err, "frame transmission failed, scheduling reconnect");

        let Lifecycle::Streaming { attempt, session } =
            std::mem::replace(&mut shared.lifecycle, Lifecycle::Idle)
        else {
            return UpdateOutcome::Skipped;
        };
        let cancel = CancellationToken::new();
        let settled = CancellationToken::new();
        self.replace_lifecycle(
            &mut shared,
            Lifecycle::Reconnecting {
                attempt,
                cancel: cancel.clone(),
                settled: settled.clone(),
            },
        );
        drop(shared);

        tokio::spawn(reconnect_task(
            self.clone(),
            session,
            attempt,
            cancel,
            settled,
        ));
        UpdateOutcome::ReconnectScheduled
    }

    /// Stop streaming. Safe in any state, including mid-handshake and
    /// while a reconnect is pending.
    ///
    /// Returns once the channel is closed and the area deactivation has been
    /// attempted, whichever task opened them.
    pub async fn stop(&self) {
        self.stop_with(|_| {}).await;
    }

    /// Full teardown: stop, forget the area, the buffer, and the bridge.
    /// Idempotent.
    pub async fn dispose(&self) {
        self.stop_with(|shared| {
            shared.area = None;
            shared.colors = ColorBuffer::default();
            shared.bridge = None;
        })
        .await;
        debug!("connection manager disposed");
    }

    /// Gate [`update`](Self::update) without tearing down the session.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.shared.lock().enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.shared.lock().enabled
    }

    // ── Color source ─────────────────────────────────────────────

    /// Overwrite the whole buffer; the length must match the area.
    pub fn set_colors(&self, colors: &[Rgb]) -> Result<(), CoreError> {
        self.inner.shared.lock().colors.copy_from(colors)
    }

    pub fn set_channel(&self, index: usize, color: Rgb) -> Result<(), CoreError> {
        self.inner.shared.lock().colors.set(index, color)
    }

    pub fn fill(&self, color: Rgb) {
        self.inner.shared.lock().colors.fill(color);
    }

    /// Snapshot of the color buffer.
    pub fn colors(&self) -> Vec<Rgb> {
        self.inner.shared.lock().colors.as_slice().to_vec()
    }

    // ── State observation ────────────────────────────────────────

    pub fn is_streaming_active(&self) -> bool {
        matches!(self.inner.shared.lock().lifecycle, Lifecycle::Streaming { .. })
    }

    pub fn is_reconnecting(&self) -> bool {
        matches!(self.inner.shared.lock().lifecycle, Lifecycle::Reconnecting { .. })
    }

    pub fn current_area(&self) -> Option<EntertainmentArea> {
        self.inner.shared.lock().area.clone()
    }

    /// Subscribe to stream state changes.
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to the error sink.
    pub fn errors(&self) -> broadcast::Receiver<ErrorReport> {
        self.inner.errors_tx.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────

    fn bridge(&self) -> Result<Arc<dyn EntertainmentBridge>, CoreError> {
        self.inner
            .shared
            .lock()
            .bridge
            .clone()
            .ok_or(CoreError::NotInitialized)
    }

    /// Apply `edit` and vacate the session slot in one step, then tear the
    /// previous occupant down. A stop already in progress is waited out.
    async fn stop_with(&self, edit: impl FnOnce(&mut Shared)) {
        let vacated = {
            let mut shared = self.inner.shared.lock();
            edit(&mut shared);
            let pending = match &shared.lifecycle {
                Lifecycle::Stopping { settled, .. } => Some(settled.clone()),
                _ => None,
            };
            match pending {
                Some(pending) => Err(pending),
                None => {
                    shared.next_attempt += 1;
                    let id = shared.next_attempt;
                    let settled = CancellationToken::new();
                    let previous = self.replace_lifecycle(
                        &mut shared,
                        Lifecycle::Stopping {
                            id,
                            settled: settled.clone(),
                        },
                    );
                    Ok((id, previous, settled))
                }
            }
        };
        let (id, previous, settled) = match vacated {
            Ok(vacated) => vacated,
            Err(pending) => {
                pending.cancelled().await;
                return;
            }
        };

        let _settled = settled.drop_guard();
        shutdown(previous).await;

        let mut shared = self.inner.shared.lock();
        if matches!(shared.lifecycle, Lifecycle::Stopping { id: current, .. } if current == id) {
            self.replace_lifecycle(&mut shared, Lifecycle::Idle);
        }
    }

    /// Reserve the slot for a new start. `None` with no area selected.
    fn claim(&self, shared: &mut Shared) -> Result<Option<Claim>, CoreError> {
        let Some(bridge) = shared.bridge.clone() else {
            return Err(CoreError::NotInitialized);
        };
        let Some(area) = shared.area.clone() else {
            return Ok(None);
        };

        shared.next_attempt += 1;
        let attempt = shared.next_attempt;
        let cancel = CancellationToken::new();
        let settled = CancellationToken::new();
        self.replace_lifecycle(
            shared,
            Lifecycle::Starting {
                attempt,
                cancel: cancel.clone(),
                settled: settled.clone(),
            },
        );
        Ok(Some(Claim {
            bridge,
            area,
            attempt,
            cancel,
            settled,
        }))
    }

    fn replace_lifecycle(&self, shared: &mut Shared, next: Lifecycle) -> Lifecycle {
        let observed = next.observed();
        let previous = std::mem::replace(&mut shared.lifecycle, next);
        self.inner.state_tx.send_if_modified(|state| {
            let changed = *state != observed;
            *state = observed;
            changed
        });
        previous
    }

    /// Drive a fresh session to streaming and install it, unless `attempt`
    /// was superseded while the handshake ran.
    async fn establish(
        &self,
        bridge: Arc<dyn EntertainmentBridge>,
        area: &EntertainmentArea,
        attempt: u64,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let mut session = StreamingSession::new(bridge, area);
        session.start(cancel).await?;

        let superseded = {
            let mut shared = self.inner.shared.lock();
            if shared.lifecycle.attempt() == Some(attempt) {
                self.replace_lifecycle(&mut shared, Lifecycle::Streaming { attempt, session });
                None
            } else {
                Some(session)
            }
        };
        let Some(mut session) = superseded else {
            return Ok(());
        };

        debug!(attempt, "start superseded, closing fresh session");
        session.stop().await;
        Err(CoreError::Cancelled)
    }

    /// Return to idle if `attempt` still owns the slot.
    fn settle_idle(&self, attempt: u64) {
        let mut shared = self.inner.shared.lock();
        if shared.lifecycle.attempt() == Some(attempt) {
            self.replace_lifecycle(&mut shared, Lifecycle::Idle);
        }
    }

    fn report(&self, err: &CoreError) {
        // No subscribers is fine.
        let _ = self.inner.errors_tx.send(ErrorReport::from(err));
    }
}

/// A reserved session slot, handed from [`ConnectionManager::claim`] to
/// the start that drives it.
struct Claim {
    bridge: Arc<dyn EntertainmentBridge>,
    area: EntertainmentArea,
    attempt: u64,
    cancel: CancellationToken,
    settled: CancellationToken,
}

/// Release whatever the slot held and wait until it is gone.
async fn shutdown(previous: Lifecycle) {
    match previous {
        Lifecycle::Idle => {}
        Lifecycle::Starting {
            cancel, settled, ..
        }
        | Lifecycle::Reconnecting {
            cancel, settled, ..
        } => {
            cancel.cancel();
            settled.cancelled().await;
        }
        Lifecycle::Streaming { mut session, .. } => session.stop().await,
        Lifecycle::Stopping { settled, .. } => settled.cancelled().await,
    }
}

/// The single automatic retry after a transmission failure.
///
/// `settled` fires when the task ends, after the failed session and any
/// superseded replacement have been closed.
async fn reconnect_task(
    manager: ConnectionManager,
    mut failed: StreamingSession,
    attempt: u64,
    cancel: CancellationToken,
    settled: CancellationToken,
) {
    let _settled = settled.drop_guard();
    let delay = manager.inner.config.reconnect_delay;
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    info!(attempt, delay_ms, "reconnecting after delay");

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            failed.stop().await;
            return;
        }
        () = tokio::time::sleep(delay) => {}
    }
    failed.stop().await;

    let target = {
        let shared = manager.inner.shared.lock();
        if shared.lifecycle.attempt() != Some(attempt) {
            return;
        }
        shared.bridge.clone().zip(shared.area.clone())
    };
    let Some((bridge, area)) = target else {
        manager.settle_idle(attempt);
        return;
    };

    match manager.establish(bridge, &area, attempt, &cancel).await {
        Ok(()) => info!(area_id = %area.id, "reconnected"),
        Err(CoreError::Cancelled) => debug!("reconnect cancelled"),
        Err(e) => {
            warn!(error = %e, "reconnect failed, giving up until restarted");
            manager.report(&e);
            manager.settle_idle(attempt);
        }
    }
}
