//! Clap derive structures for the `huestream` CLI.
//!
//! Shared with `build.rs` for man page generation, so this file may only
//! depend on clap and clap_complete.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// huestream -- drive Hue entertainment areas in real time
#[derive(Debug, Parser)]
#[command(
    name = "huestream",
    version,
    about = "Stream real-time colors to Hue entertainment areas",
    long_about = "Discover a Hue bridge, register with it, pick an entertainment area,\n\
        and stream colors to it over the bridge's DTLS entertainment channel.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Bridge profile to use
    #[arg(long, short = 'p', env = "HUESTREAM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "HUESTREAM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HUESTREAM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find bridges on the local network via cloud discovery
    Discover,

    /// Register with a bridge (press its link button first)
    #[command(alias = "pair")]
    Register(RegisterArgs),

    /// Inspect entertainment areas configured on the bridge
    #[command(alias = "a")]
    Areas(AreasArgs),

    /// Stream a color pattern to the selected area
    #[command(alias = "s")]
    Stream(StreamArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REGISTER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Bridge IPv4 address (omit to pick from discovered bridges)
    pub address: Option<String>,

    /// Application label sent to the bridge
    #[arg(long, default_value = "huestream#cli")]
    pub label: String,

    /// Seconds between attempts while waiting for the link button
    #[arg(long, default_value = "2")]
    pub interval: u64,

    /// Attempts before giving up
    #[arg(long, default_value = "15")]
    pub attempts: u32,

    /// Write the client key into the config file instead of the keyring
    #[arg(long)]
    pub plaintext: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AREAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AreasArgs {
    #[command(subcommand)]
    pub command: AreasCommand,
}

#[derive(Debug, Subcommand)]
pub enum AreasCommand {
    /// List entertainment areas
    #[command(alias = "ls")]
    List,

    /// Show one area with its channels
    Get {
        /// Area id
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STREAM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StreamArgs {
    /// Color pattern
    #[arg(long, default_value = "rainbow", value_enum)]
    pub pattern: Pattern,

    /// Base color as hex (e.g. ff8000)
    #[arg(long, default_value = "ffffff")]
    pub color: String,

    /// Frames per second, 1-60 (overrides the configured default)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub fps: Option<u32>,

    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,

    /// Area id (overrides the profile's selected area)
    #[arg(long)]
    pub area: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Every channel shows the base color
    Solid,
    /// Hue wheel rotating across channels
    Rainbow,
    /// Base color breathing in brightness
    Pulse,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the current configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Select the entertainment area to stream to
    UseArea {
        /// Area id
        id: String,

        /// Confirm the area exists on the bridge before saving
        #[arg(long)]
        check: bool,
    },

    /// Allow streaming for the profile
    Enable,

    /// Block streaming for the profile without forgetting its settings
    Disable,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
