//! `huestream register`: link-button pairing and credential persistence.

use std::io::IsTerminal;
use std::time::Duration;

use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::ExposeSecret;

use huestream_config as store;
use huestream_core::{BridgeDevice, ManagerConfig, RetryPolicy};

use crate::cli::{GlobalOpts, RegisterArgs};
use crate::config::Loaded;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: RegisterArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut loaded = Loaded::load(global)?;
    let profile_name = loaded.profile_name(global);
    let manager_config = loaded.manager_config(loaded.config.profiles.get(&profile_name));

    let (address, bridge_id) = match args.address {
        Some(address) => (address, None),
        None => {
            let bridge = pick_bridge(&manager_config).await?;
            (bridge.address.to_string(), Some(bridge.id))
        }
    };

    let policy = RetryPolicy {
        interval: Duration::from_secs(args.interval),
        max_attempts: args.attempts,
    };

    let spinner = if global.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Registering with the bridge at {address}"));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = huestream_core::register_with_retry(
        &manager_config,
        &address,
        &args.label,
        &policy,
        |attempt| {
            spinner.set_message(format!(
                "Press the link button on the bridge at {address} ({attempt}/{})",
                policy.max_attempts
            ));
        },
    )
    .await;
    spinner.finish_and_clear();
    let credentials = result?;

    // Keyring first; a headless box without a secret service falls back to the file.
    let in_keyring = !args.plaintext
        && match store::store_client_key(&profile_name, &credentials.client_key) {
            Ok(()) => true,
            Err(e) => {
                output::warning(
                    &global.color,
                    &format!("{e}; saving the client key to the config file instead"),
                );
                false
            }
        };

    let profile = loaded.config.profiles.entry(profile_name.clone()).or_default();
    if profile.bridge != credentials.address {
        profile.area = None;
    }
    profile.bridge.clone_from(&credentials.address);
    if bridge_id.is_some() {
        profile.bridge_id = bridge_id;
    }
    profile.username = Some(credentials.username.expose_secret().to_owned());
    profile.client_key = (!in_keyring).then(|| credentials.client_key.expose_secret().to_owned());

    let has_default = loaded
        .config
        .default_profile
        .as_ref()
        .is_some_and(|name| loaded.config.profiles.contains_key(name));
    if !has_default {
        loaded.config.default_profile = Some(profile_name.clone());
    }
    loaded.save()?;

    output::success(
        &global.color,
        global.quiet,
        &format!(
            "Registered with {address}; profile '{profile_name}' saved to {}",
            loaded.path.display()
        ),
    );
    if !global.quiet {
        eprintln!("  Next: huestream areas list");
    }
    Ok(())
}

/// One discovered bridge: the only one, or the user's pick.
async fn pick_bridge(config: &ManagerConfig) -> Result<BridgeDevice, CliError> {
    let mut bridges = huestream_core::discover(config).await?;
    match bridges.len() {
        0 => Err(CliError::NoBridges),
        1 => Ok(bridges.remove(0)),
        _ if !std::io::stdin().is_terminal() => Err(CliError::Validation {
            field: "address".into(),
            reason: format!(
                "{} bridges found; pass one address explicitly",
                bridges.len()
            ),
        }),
        _ => {
            let labels: Vec<String> = bridges
                .iter()
                .map(|b| format!("{} ({})", b.address, b.id))
                .collect();
            let choice = Select::new()
                .with_prompt("Which bridge?")
                .items(&labels)
                .default(0)
                .interact()
                .map_err(|e| CliError::Validation {
                    field: "interactive".into(),
                    reason: format!("prompt failed: {e}"),
                })?;
            Ok(bridges.swap_remove(choice))
        }
    }
}
