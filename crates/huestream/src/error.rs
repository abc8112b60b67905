//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use huestream_config::ConfigError;
use huestream_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Setup ────────────────────────────────────────────────────────

    #[error("Bridge discovery is unavailable: {reason}")]
    #[diagnostic(
        code(huestream::discovery_unavailable),
        help(
            "Check your internet connection, or skip discovery by passing the\n\
             bridge address directly: huestream register <address>"
        )
    )]
    DiscoveryUnavailable { reason: String },

    #[error("No bridges found")]
    #[diagnostic(
        code(huestream::no_bridges),
        help("Make sure the bridge is powered and on the same network, or pass its address.")
    )]
    NoBridges,

    #[error("The bridge link button was not pressed")]
    #[diagnostic(
        code(huestream::link_button),
        help("Press the round button on top of the bridge, then run: huestream register")
    )]
    LinkButtonNotPressed,

    #[error("Registration rejected: {description}")]
    #[diagnostic(code(huestream::registration_rejected))]
    RegistrationRejected { description: String },

    #[error("'{address}' is not a usable bridge address")]
    #[diagnostic(
        code(huestream::invalid_address),
        help("Use the bridge's IPv4 address, e.g. 192.168.1.20. Run: huestream discover")
    )]
    InvalidAddress { address: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("The bridge rejected the stored credentials")]
    #[diagnostic(
        code(huestream::auth_failed),
        help("The application key may have been revoked. Run: huestream register")
    )]
    AuthFailed,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(huestream::no_credentials),
        help(
            "Register with the bridge first: huestream register\n\
             Or set HUESTREAM_CLIENT_KEY for an existing registration."
        )
    )]
    NoCredentials { profile: String },

    // ── Streaming ────────────────────────────────────────────────────

    #[error("Could not reach the bridge: {reason}")]
    #[diagnostic(
        code(huestream::connection_failed),
        help("Check that the bridge address in your profile is still correct.")
    )]
    ConnectionFailed { reason: String },

    #[error("Could not activate entertainment area: {reason}")]
    #[diagnostic(
        code(huestream::activation_failed),
        help("Another application may be streaming to this area. Stop it and try again.")
    )]
    ActivationFailed { reason: String },

    #[error("Secure streaming channel failed: {reason}")]
    #[diagnostic(
        code(huestream::handshake_failed),
        help("UDP port 2100 must be reachable on the bridge.")
    )]
    HandshakeFailed { reason: String },

    #[error("Secure streaming channel timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(huestream::handshake_timeout),
        help("UDP port 2100 must be reachable on the bridge.")
    )]
    HandshakeTimeout { timeout_ms: u64 },

    #[error("No entertainment area selected for profile '{profile}'")]
    #[diagnostic(
        code(huestream::no_area),
        help(
            "List areas with: huestream areas list\n\
             Then select one: huestream config use-area <id>"
        )
    )]
    NoAreaSelected { profile: String },

    #[error("Streaming is disabled for profile '{profile}'")]
    #[diagnostic(
        code(huestream::disabled),
        help("Enable it with: huestream config enable")
    )]
    StreamingDisabled { profile: String },

    #[error("{message}")]
    #[diagnostic(code(huestream::streaming))]
    Streaming { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(huestream::not_found),
        help("Run: huestream {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Bridge error: {message}")]
    #[diagnostic(code(huestream::bridge))]
    Bridge { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(huestream::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(huestream::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: huestream register"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(huestream::no_config),
        help(
            "Register with a bridge to create it: huestream register\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(huestream::config))]
    Config(ConfigError),

    #[error("{0}")]
    #[diagnostic(code(huestream::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DiscoveryUnavailable { .. } | Self::ConnectionFailed { .. } => {
                exit_code::CONNECTION
            }
            Self::LinkButtonNotPressed
            | Self::RegistrationRejected { .. }
            | Self::AuthFailed
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::NoBridges | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::HandshakeTimeout { .. } => exit_code::TIMEOUT,
            Self::InvalidAddress { .. }
            | Self::Validation { .. }
            | Self::NoAreaSelected { .. }
            | Self::StreamingDisabled { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::from("(none)"),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DiscoveryUnavailable { reason } => CliError::DiscoveryUnavailable { reason },
            CoreError::LinkButtonNotPressed => CliError::LinkButtonNotPressed,
            CoreError::RegistrationRejected { description, .. } => {
                CliError::RegistrationRejected { description }
            }
            CoreError::InvalidAddress { address } => CliError::InvalidAddress { address },
            CoreError::Unauthorized => CliError::AuthFailed,

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::ActivationFailed { reason, .. } => CliError::ActivationFailed { reason },
            CoreError::HandshakeFailed { reason } => CliError::HandshakeFailed { reason },
            CoreError::HandshakeTimeout { timeout_ms } => CliError::HandshakeTimeout { timeout_ms },

            CoreError::Bridge { message, .. } => CliError::Bridge { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::ChannelCountMismatch { .. } | CoreError::ChannelOutOfRange { .. } => {
                CliError::Validation {
                    field: "colors".into(),
                    reason: err.to_string(),
                }
            }

            CoreError::TransmissionFailed { .. }
            | CoreError::NotConnected
            | CoreError::Cancelled
            | CoreError::NotInitialized => CliError::Streaming {
                message: err.to_string(),
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
