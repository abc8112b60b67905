//! Profile resolution on top of `huestream_config`.
//!
//! This is the single place where the settings store crosses into core:
//! a profile becomes `Credentials` + `ManagerConfig`, and a bound
//! `ConnectionManager` comes out.

use std::path::PathBuf;

use huestream_config::{self as store, Config, Profile};
use huestream_core::{ConnectionManager, ManagerConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Loaded configuration plus where it came from.
pub struct Loaded {
    pub path: PathBuf,
    pub config: Config,
}

impl Loaded {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = global.config.clone().unwrap_or_else(store::config_path);
        let config = store::load_config_from(&path)?;
        Ok(Self { path, config })
    }

    pub fn profile_name(&self, global: &GlobalOpts) -> String {
        self.config.profile_name(global.profile.as_deref())
    }

    /// The active profile, or a diagnostic naming what exists.
    pub fn profile(&self, name: &str) -> Result<&Profile, CliError> {
        if self.config.profiles.is_empty() {
            return Err(CliError::NoConfig {
                path: self.path.display().to_string(),
            });
        }
        self.config
            .profiles
            .get(name)
            .ok_or_else(|| self.profile_not_found(name))
    }

    pub fn profile_mut(&mut self, name: &str) -> Result<&mut Profile, CliError> {
        if !self.config.profiles.contains_key(name) {
            return Err(if self.config.profiles.is_empty() {
                CliError::NoConfig {
                    path: self.path.display().to_string(),
                }
            } else {
                self.profile_not_found(name)
            });
        }
        Ok(self.config.profile_mut(name)?)
    }

    /// Manager settings for `profile` (or the global defaults).
    pub fn manager_config(&self, profile: Option<&Profile>) -> ManagerConfig {
        store::manager_config(&self.config.defaults, profile)
    }

    pub fn save(&self) -> Result<(), CliError> {
        store::save_config_to(&self.config, &self.path)?;
        Ok(())
    }

    fn profile_not_found(&self, name: &str) -> CliError {
        let mut names: Vec<&str> = self.config.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        CliError::ProfileNotFound {
            name: name.into(),
            available: names.join(", "),
        }
    }
}

/// A manager bound to the active profile's bridge.
pub struct Bound {
    pub loaded: Loaded,
    pub profile_name: String,
    pub manager: ConnectionManager,
}

impl Bound {
    pub fn profile(&self) -> Result<&Profile, CliError> {
        self.loaded.profile(&self.profile_name)
    }
}

/// Load the active profile and bind a fresh manager to its bridge.
pub async fn connect(global: &GlobalOpts) -> Result<Bound, CliError> {
    let loaded = Loaded::load(global)?;
    let profile_name = loaded.profile_name(global);
    let profile = loaded.profile(&profile_name)?;

    let credentials = store::profile_to_credentials(profile, &profile_name)?;
    let manager = ConnectionManager::new(loaded.manager_config(Some(profile)));
    manager.init(&credentials).await?;

    tracing::debug!(profile = %profile_name, address = %profile.bridge, "manager bound");
    Ok(Bound {
        loaded,
        profile_name,
        manager,
    })
}
