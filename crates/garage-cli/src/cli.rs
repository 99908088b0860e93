//! Clap derive structures for the `garage` CLI.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// garage -- operate a garage door through its realtime database
#[derive(Debug, Parser)]
#[command(
    name = "garage",
    version,
    about = "Operate a garage door from the command line",
    long_about = "Reads and drives a garage door whose controller syncs through a\n\
        realtime database: door status, open/close actions, and auto-close settings.",
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
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "GARAGE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Realtime database URL (overrides profile)
    #[arg(long, env = "GARAGE_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Garage node under `garages/` (overrides profile)
    #[arg(long, short = 'g', env = "GARAGE_ID", global = true)]
    pub garage: Option<String>,

    /// Identity stamped on actions (overrides profile)
    #[arg(long, env = "GARAGE_ISSUER_ID", global = true)]
    pub issuer_id: Option<String>,

    /// Database auth token
    #[arg(long, env = "GARAGE_AUTH_TOKEN", global = true, hide_env_values = true)]
    pub auth_token: Option<String>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request and sync timeout in seconds
    #[arg(long, env = "GARAGE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Show door status and auto-close settings
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Ask the door to open
    Open,

    /// Ask the door to close (pauses an opening door)
    Close,

    /// Stop a pending auto-close
    CancelAutoClose,

    /// Follow status changes, reversals and auto-close warnings
    Watch(WatchArgs),

    /// Change auto-close settings
    #[command(alias = "ac")]
    AutoClose(AutoCloseArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Auto-close ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AutoCloseArgs {
    #[command(subcommand)]
    pub command: AutoCloseCommand,
}

#[derive(Debug, Subcommand)]
pub enum AutoCloseCommand {
    /// Close automatically after the configured timeout
    Enable,
    /// Never close automatically
    Disable,
    /// Announce an auto-close before it happens
    Warn,
    /// Close without announcing
    NoWarn,
    /// Close-after duration (e.g. "30m", "1h 15m")
    Timeout {
        #[arg(value_parser = parse_duration)]
        duration: Duration,
    },
    /// Warn-after duration (e.g. "15m")
    WarningTimeout {
        #[arg(value_parser = parse_duration)]
        duration: Duration,
    },
}

fn parse_duration(raw: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(raw)
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile
    Init {
        /// Realtime database URL
        #[arg(long)]
        database_url: String,
        /// Identity stamped on actions
        #[arg(long)]
        issuer_id: String,
        /// Garage node under `garages/`
        #[arg(long)]
        garage_id: Option<String>,
        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },
    /// Print the resolved configuration
    Show,
    /// Print the config file path
    Path,
    /// Store an auth token in the system keyring
    SetToken {
        /// The database secret or ID token
        token: String,
    },
}
