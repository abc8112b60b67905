//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use huestream_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Loaded};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

#[derive(Debug, Clone, Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    #[serde(skip)]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Bridge")]
    bridge: String,
    #[tabled(rename = "Area")]
    area: String,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(skip)]
    default: bool,
}

fn profile_rows(cfg: &Config) -> Vec<ProfileRow> {
    let default = cfg.default_profile.as_deref();
    let mut rows: Vec<ProfileRow> = cfg
        .profiles
        .iter()
        .map(|(name, p)| {
            let is_default = default == Some(name.as_str());
            ProfileRow {
                marker: if is_default { "*" } else { "" },
                name: name.clone(),
                bridge: p.bridge.clone(),
                area: p.area.clone().unwrap_or_else(|| "-".into()),
                enabled: p.enabled,
                default: is_default,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Copy of the config safe to print: plaintext client keys are masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.client_key.is_some() {
            profile.client_key = Some(REDACTED.into());
        }
    }
    cfg
}

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let loaded = Loaded::load(global)?;
            let shown = redacted(&loaded.config);
            let out = output::render_single(
                &global.output,
                &shown,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n# {e}")),
                |_| loaded.path.display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let loaded = Loaded::load(global)?;
            output::print_output(&loaded.path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let loaded = Loaded::load(global)?;
            let rows = profile_rows(&loaded.config);
            if rows.is_empty() {
                eprintln!("No profiles configured. Run: huestream register");
                return Ok(());
            }
            let out =
                output::render_list(&global.output, &rows, ProfileRow::clone, |r| r.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut loaded = Loaded::load(global)?;
            loaded.profile(&name)?;
            loaded.config.default_profile = Some(name.clone());
            loaded.save()?;
            output::success(
                &global.color,
                global.quiet,
                &format!("Default profile set to '{name}'"),
            );
            Ok(())
        }

        ConfigCommand::UseArea { id, check } => {
            let mut loaded = if check {
                let bound = config::connect(global).await?;
                let found = bound.manager.find_area(&id).await?;
                bound.manager.dispose().await;
                if found.is_none() {
                    return Err(CliError::NotFound {
                        resource_type: "area".into(),
                        identifier: id,
                        list_command: "areas list".into(),
                    });
                }
                bound.loaded
            } else {
                Loaded::load(global)?
            };
            let profile_name = loaded.profile_name(global);
            loaded.profile_mut(&profile_name)?.area = Some(id.clone());
            loaded.save()?;
            output::success(
                &global.color,
                global.quiet,
                &format!("Profile '{profile_name}' will stream to area {id}"),
            );
            Ok(())
        }

        ConfigCommand::Enable => set_enabled(global, true),
        ConfigCommand::Disable => set_enabled(global, false),
    }
}

fn set_enabled(global: &GlobalOpts, enabled: bool) -> Result<(), CliError> {
    let mut loaded = Loaded::load(global)?;
    let profile_name = loaded.profile_name(global);
    loaded.profile_mut(&profile_name)?.enabled = enabled;
    loaded.save()?;
    let verb = if enabled { "enabled" } else { "disabled" };
    output::success(
        &global.color,
        global.quiet,
        &format!("Streaming {verb} for profile '{profile_name}'"),
    );
    Ok(())
}
