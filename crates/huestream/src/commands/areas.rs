//! `huestream areas`

use std::fmt::Write as _;

use tabled::Tabled;

use huestream_core::EntertainmentArea;

use crate::cli::{AreasArgs, AreasCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct AreaRow {
    #[tabled(rename = "")]
    selected: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Channels")]
    channels: usize,
    #[tabled(rename = "Streaming")]
    active: &'static str,
}

fn area_row(area: &EntertainmentArea, selected: Option<&str>) -> AreaRow {
    AreaRow {
        selected: if selected == Some(area.id.as_str()) { "*" } else { "" },
        id: area.id.clone(),
        name: area.name.clone(),
        kind: area.configuration_type.clone().unwrap_or_default(),
        channels: area.channel_count(),
        active: if area.active { "yes" } else { "no" },
    }
}

fn area_detail(area: &EntertainmentArea) -> String {
    let mut out = format!(
        "ID:        {}\nName:      {}\nType:      {}\nStreaming: {}\nChannels:  {}",
        area.id,
        area.name,
        area.configuration_type.as_deref().unwrap_or("-"),
        if area.active { "yes" } else { "no" },
        area.channel_count(),
    );
    for channel in &area.channels {
        let members: Vec<&str> = channel.members.iter().map(|m| m.rid.as_str()).collect();
        let _ = write!(out, "\n  [{}] {}", channel.index, members.join(", "));
    }
    out
}

pub async fn handle(args: AreasArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let bound = config::connect(global).await?;
    let selected = bound.profile()?.area.clone();

    match args.command {
        AreasCommand::List => {
            let areas = bound.manager.list_areas().await?;
            let out = output::render_list(
                &global.output,
                &areas,
                |a| area_row(a, selected.as_deref()),
                |a| a.id.clone(),
            );
            output::print_output(&out, global.quiet);
        }

        AreasCommand::Get { id } => {
            let area = bound
                .manager
                .find_area(&id)
                .await?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "area".into(),
                    identifier: id,
                    list_command: "areas list".into(),
                })?;
            let out = output::render_single(&global.output, &area, area_detail, |a| a.id.clone());
            output::print_output(&out, global.quiet);
        }
    }

    bound.manager.dispose().await;
    Ok(())
}
