//! Clap derive structures for the `sdwatch` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sdwatch_core::BusKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sdwatch -- systemd health at a glance
#[derive(Debug, Parser)]
#[command(
    name = "sdwatch",
    version,
    about = "Watch systemd manager health from the command line",
    long_about = "Reports the systemd manager state and its failed units.\n\n\
        Subscribes to the manager over D-Bus and re-evaluates health on every\n\
        property change and completed job.",
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
    /// Profile to use (`system`, `user`, or one from the config file)
    #[arg(long, short = 'p', env = "SDWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Bus to connect to (overrides profile)
    #[arg(long, value_enum, env = "SDWATCH_BUS", global = true)]
    pub bus: Option<BusArg>,

    /// Explicit D-Bus address, e.g. `unix:path=/run/dbus/system_bus_socket`
    #[arg(long, env = "SDWATCH_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, env = "SDWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format [default: from config, else text]
    #[arg(long, short = 'o', value_enum, env = "SDWATCH_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, value_enum, global = true)]
    pub color: Option<ColorMode>,

    /// Config file to use instead of the platform default
    #[arg(long, env = "SDWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BusArg {
    /// The system bus (PID 1)
    System,
    /// The session bus (`systemd --user`)
    Session,
}

impl From<BusArg> for BusKind {
    fn from(arg: BusArg) -> Self {
        match arg {
            BusArg::System => BusKind::System,
            BusArg::Session => BusKind::Session,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indicator line plus failed units (default, interactive)
    Text,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Severity only (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Print the current health snapshot and exit
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Print a snapshot on every change until interrupted
    #[command(alias = "w")]
    Watch,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Exit with 10 when Yellow and 11 when Red
    #[arg(long)]
    pub exit_code: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display the loaded configuration
    Show,

    /// Print the config file path
    Path,

    /// List available profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sdwatch", "status", "--bus", "session", "-o", "json-compact", "--exit-code",
        ])
        .unwrap();
        assert_eq!(cli.global.bus, Some(BusArg::Session));
        assert_eq!(cli.global.output, Some(OutputFormat::JsonCompact));
        assert!(matches!(cli.command, Command::Status(StatusArgs { exit_code: true })));
    }
}
