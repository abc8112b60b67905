//! Command dispatch: CLI args -> core operations -> output formatting.

pub mod areas;
pub mod config_cmd;
pub mod discover;
pub mod register;
pub mod stream;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Discover => discover::handle(global).await,
        Command::Register(args) => register::handle(args, global).await,
        Command::Areas(args) => areas::handle(args, global).await,
        Command::Stream(args) => stream::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global).await,
        // Completions need the clap command tree and are handled in main
        Command::Completions(_) => Ok(()),
    }
}
