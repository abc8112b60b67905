//! `huestream discover`

use tabled::Tabled;

use huestream_core::BridgeDevice;

use crate::cli::GlobalOpts;
use crate::config::Loaded;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct BridgeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Port")]
    port: String,
}

impl From<&BridgeDevice> for BridgeRow {
    fn from(b: &BridgeDevice) -> Self {
        Self {
            id: b.id.clone(),
            address: b.address.to_string(),
            port: b.port.map_or_else(|| "-".into(), |p| p.to_string()),
        }
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let loaded = Loaded::load(global)?;
    let bridges = huestream_core::discover(&loaded.manager_config(None)).await?;

    if bridges.is_empty() {
        return Err(CliError::NoBridges);
    }

    let out = output::render_list(&global.output, &bridges, |b| BridgeRow::from(b), |b| {
        b.address.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
