//! Settings store for huestream.
//!
//! TOML profiles, client key resolution (env + keyring + plaintext), and
//! translation to `huestream_core::{Credentials, ManagerConfig}`. The core
//! never reads these files; the CLI loads a profile and hands the result in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use huestream_core::{Credentials, ManagerConfig, TlsVerification};

const KEYRING_SERVICE: &str = "huestream";
const CLIENT_KEY_ENV: &str = "HUESTREAM_CLIENT_KEY";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named bridge profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile name to use: explicit override, else the configured
    /// default, else `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }

    pub fn profile_mut(&mut self, name: &str) -> Result<&mut Profile, ConfigError> {
        self.profiles
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// REST timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Frames per second for `stream`.
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            fps: default_fps(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_handshake_timeout_ms() -> u64 {
    5000
}
fn default_reconnect_delay_ms() -> u64 {
    2000
}
fn default_fps() -> u32 {
    25
}
fn default_enabled() -> bool {
    true
}

/// A named bridge profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Bridge address (IPv4 literal).
    pub bridge: String,

    /// Bridge id as reported by discovery.
    pub bridge_id: Option<String>,

    /// Application key issued at registration.
    pub username: Option<String>,

    /// Client key (plaintext, prefer keyring or env var).
    pub client_key: Option<String>,

    /// Environment variable name containing the client key.
    pub client_key_env: Option<String>,

    /// Selected entertainment area id.
    pub area: Option<String>,

    /// Whether streaming is enabled for this profile.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Verify the bridge certificate against the system store.
    pub strict_tls: Option<bool>,

    /// Override REST timeout (seconds).
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            bridge: String::new(),
            bridge_id: None,
            username: None,
            client_key: None,
            client_key_env: None,
            area: None,
            enabled: default_enabled(),
            ca_cert: None,
            strict_tls: None,
            timeout: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "huestream", "huestream").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("huestream");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file yields defaults.
///
/// Environment keys nest with a double underscore:
/// `HUESTREAM_DEFAULTS__FPS=50`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HUESTREAM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/client-key"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Store a client key in the system keyring.
pub fn store_client_key(profile_name: &str, client_key: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(client_key.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve the client key: profile env var, `HUESTREAM_CLIENT_KEY`,
/// keyring, then plaintext in the profile.
pub fn resolve_client_key(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Env var (profile-specific name first)
    let env_names = profile.client_key_env.as_deref().into_iter().chain([CLIENT_KEY_ENV]);
    for name in env_names {
        if let Ok(val) = std::env::var(name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.client_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build core `Credentials` from a profile.
pub fn profile_to_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Credentials, ConfigError> {
    if profile.bridge.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "bridge".into(),
            reason: "bridge address is empty".into(),
        });
    }
    let username = profile
        .username
        .clone()
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let client_key = resolve_client_key(profile, profile_name)?;

    Ok(Credentials {
        address: profile.bridge.clone(),
        username: SecretString::from(username),
        client_key,
    })
}

/// Build a `ManagerConfig` from global defaults and a profile's overrides.
pub fn manager_config(defaults: &Defaults, profile: Option<&Profile>) -> ManagerConfig {
    let tls = match profile {
        Some(Profile {
            ca_cert: Some(path),
            ..
        }) => TlsVerification::CustomCa(path.clone()),
        Some(p) if p.strict_tls.unwrap_or(false) => TlsVerification::SystemDefaults,
        _ => TlsVerification::DangerAcceptInvalid, // bridges ship self-signed certs
    };
    let timeout = profile
        .and_then(|p| p.timeout)
        .unwrap_or(defaults.timeout);

    ManagerConfig {
        tls,
        timeout: Duration::from_secs(timeout),
        handshake_timeout: Duration::from_millis(defaults.handshake_timeout_ms),
        reconnect_delay: Duration::from_millis(defaults.reconnect_delay_ms),
        ..ManagerConfig::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "living"

[defaults]
fps = 30

[profiles.living]
bridge = "192.168.1.20"
username = "abcdef123456"
client_key = "00112233445566778899aabbccddeeff"
area = "1a8d99cc-967b-44f2-9202-43f976c0fa6b"
enabled = false
"#;

    #[test]
    fn loads_profiles_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.profile_name(None), "living");
        assert_eq!(cfg.defaults.fps, 30);
        assert_eq!(cfg.defaults.reconnect_delay_ms, 2000);

        let profile = cfg.profile("living").unwrap();
        assert_eq!(profile.bridge, "192.168.1.20");
        assert!(!profile.enabled);
        assert!(matches!(
            cfg.profile("other"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.profile_name(None), "default");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn save_then_load_preserves_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                bridge: "10.0.0.5".into(),
                username: Some("u1".into()),
                area: Some("area-1".into()),
                enabled: true,
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.area.as_deref(), Some("area-1"));
        assert!(profile.enabled);
    }

    #[test]
    fn credentials_from_plaintext_profile() {
        let cfg: Config = toml::from_str(SAMPLE).unwrap();
        let creds = profile_to_credentials(cfg.profile("living").unwrap(), "living").unwrap();
        assert_eq!(creds.address, "192.168.1.20");
        assert_eq!(creds.username.expose_secret(), "abcdef123456");
    }

    #[test]
    fn profile_without_username_has_no_credentials() {
        let profile = Profile {
            bridge: "10.0.0.5".into(),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_credentials(&profile, "x"),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn manager_config_applies_overrides() {
        let defaults = Defaults {
            handshake_timeout_ms: 1500,
            ..Defaults::default()
        };
        let profile = Profile {
            timeout: Some(3),
            strict_tls: Some(true),
            ..Profile::default()
        };

        let cfg = manager_config(&defaults, Some(&profile));
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.handshake_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);

        let cfg = manager_config(&Defaults::default(), None);
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(cfg.reconnect_delay, Duration::from_millis(2000));
    }
}
