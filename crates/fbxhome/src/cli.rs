//! Clap derive structures for the `fbxhome` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fbxhome -- keep a Freebox in sync and send it commands
#[derive(Debug, Parser)]
#[command(
    name = "fbxhome",
    version,
    about = "Track Freebox devices and drive the player from the command line",
    long_about = "Polls a Freebox appliance for its hosts, Wi-Fi clients and \
        home-automation nodes, and forwards remote-control, Wi-Fi and reboot commands.",
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
    /// Appliance profile to use
    #[arg(long, short = 'p', env = "FBXHOME_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Appliance host (overrides profile)
    #[arg(long, env = "FBXHOME_HOST", global = true)]
    pub host: Option<String>,

    /// Appliance root CA certificate (enables verification)
    #[arg(long, global = true)]
    pub ca_cert: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', env = "FBXHOME_OUTPUT", default_value = "table", global = true)]
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

    /// Skip confirmation for disruptive commands
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FBXHOME_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the sync loop and print changes until interrupted
    #[command(alias = "w")]
    Watch,

    /// Run one pass and list tracked devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show appliance identity, connection and sensors
    Status,

    /// Send a remote-control key to the player
    Remote(RemoteArgs),

    /// Press the player's power key
    Power(PressArgs),

    /// Press the player's play key
    Play(PressArgs),

    /// Reboot the appliance
    Reboot,

    /// Turn the appliance's Wi-Fi on or off
    Wifi(WifiArgs),

    /// Invert (or restore) the reported position of a shutter
    InvertShutter(InvertShutterArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only show reachable devices
    #[arg(long)]
    pub reachable: bool,

    /// Only show one kind of device
    #[arg(long, value_enum)]
    pub kind: Option<KindFilter>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindFilter {
    /// Network hosts (LAN and Wi-Fi)
    Host,
    /// Home-automation nodes
    Node,
}

#[derive(Debug, Args)]
pub struct PressArgs {
    /// Hold the key
    #[arg(long)]
    pub long_press: bool,

    /// Send the key this many times (0 or 1 sends it once)
    #[arg(long, default_value_t = 0)]
    pub repeat: u64,
}

#[derive(Debug, Args)]
pub struct RemoteArgs {
    /// Key code: red green blue yellow power list tv 0-9 back swap info
    /// epg mail media help options pip vol_inc vol_dec ok up right down
    /// left prgm_inc prgm_dec mute home rec bwd prev play fwd next
    pub code: String,

    #[command(flatten)]
    pub press: PressArgs,
}

#[derive(Debug, Args)]
pub struct WifiArgs {
    /// Desired state
    #[arg(value_enum)]
    pub state: WifiState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WifiState {
    On,
    Off,
}

#[derive(Debug, Args)]
pub struct InvertShutterArgs {
    /// Home node id of the shutter
    pub node_id: u64,

    /// Restore the normal direction instead
    #[arg(long)]
    pub off: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
