//! Streaming lifecycle layer between `huestream-api` and host applications.
//!
//! - **[`ConnectionManager`]**: the orchestration facade. Holds the selected
//!   area, the color buffer, and the enabled flag; enforces one session at a
//!   time and owns the single automatic reconnect after a transmission
//!   failure. State changes are observable via [`ConnectionManager::state`],
//!   failures via [`ConnectionManager::errors`].
//!
//! - **[`StreamingSession`]**: one DTLS connection for one entertainment
//!   area, with an explicit [`SessionState`] machine.
//!
//! - **[`EntertainmentBridge`] / [`FrameChannel`]**: the seam between the
//!   lifecycle logic and the network. [`HueBridge`] is the real
//!   implementation.
//!
//! - **Setup** ([`setup`]): discovery and registration, including the
//!   link button wait loop.
//!
//! ```no_run
//! # tokio_test::block_on(async {
//! use huestream_core::{ConnectionManager, Credentials, ManagerConfig, Rgb};
//! use secrecy::SecretString;
//!
//! let manager = ConnectionManager::new(ManagerConfig::default());
//! manager
//!     .init(&Credentials {
//!         address: "192.168.1.20".into(),
//!         username: SecretString::from("app-key".to_string()),
//!         client_key: SecretString::from("00112233445566778899aabbccddeeff".to_string()),
//!     })
//!     .await?;
//!
//! if let Some(area) = manager.find_area("1a8d99cc-967b-44f2-9202-43f976c0fa6b").await? {
//!     manager.set_area(area).await;
//!     manager.start().await?;
//!     manager.fill(Rgb::new(255, 80, 0));
//!     manager.update();
//!     manager.stop().await;
//! }
//! # Ok::<(), huestream_core::CoreError>(())
//! # }).unwrap();
//! ```

pub mod bridge;
pub mod config;
pub mod convert;
pub mod error;
pub mod manager;
pub mod model;
pub mod session;
pub mod setup;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{BridgeConnector, EntertainmentBridge, FrameChannel, HueBridge, HueConnector};
pub use config::{ManagerConfig, TlsVerification};
pub use error::{CoreError, ErrorKind};
pub use manager::{ConnectionManager, ErrorReport, StreamState, UpdateOutcome};
pub use model::{BridgeDevice, Channel, ColorBuffer, Credentials, EntertainmentArea, ResourceRef, Rgb};
pub use session::{SessionState, StreamingSession};
pub use setup::{RetryPolicy, discover, register, register_with_retry};
