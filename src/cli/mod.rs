//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::device::{DeviceInfo, DeviceModel};
use crate::keys::Channel;
use crate::profile::{Bank, RepeatMode};

/// G-key macro CLI - profiles, macro resolution and key packet decoding for
/// Logitech G-series keyboards.
///
/// Robot Mode: use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "gkm", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "GKM_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Device uid profiles are stored under
    #[arg(long, short = 'd', global = true, env = "GKM_DEVICE", default_value = "g19")]
    pub device: String,

    /// Keyboard model, for key ordering
    #[arg(long, global = true, env = "GKM_MODEL", default_value = "g19")]
    pub model: DeviceModel,

    /// Configuration directory (default: platform config dir + /gkm)
    #[arg(long, global = true, env = "GKM_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }

    /// The device selected by `--device` and `--model`.
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(self.device.clone(), self.model)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Profiles ===
    /// List the device's profiles
    #[command(visible_alias = "ls")]
    Profiles,

    /// Show a profile and its macros
    Show(ShowArgs),

    /// Create a profile
    Create(CreateArgs),

    /// Delete a profile
    Delete(DeleteArgs),

    /// Make a profile the active one
    Activate(ActivateArgs),

    /// Lock or unlock profile switching
    Lock(LockArgs),

    // === Macros ===
    /// Bind a macro to a key combination
    AddMacro(AddMacroArgs),

    /// Remove the macro bound to a key combination
    RemoveMacro(MacroKeysArgs),

    /// Show which macro a key combination runs, following base profiles
    Resolve(MacroKeysArgs),

    // === Key input ===
    /// Decode one raw key packet
    Decode(DecodeArgs),

    /// Run a packet script through the macro engine
    Replay(ReplayArgs),

    // === Archives ===
    /// Export a profile and its images to a zip archive
    Export(ExportArgs),

    /// Import a profile archive
    Import(ImportArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Profile id (default: the active profile)
    pub id: Option<u64>,

    /// Only show one memory bank
    #[arg(long, short = 'b')]
    pub bank: Option<Bank>,

    /// Include macros inherited from base profiles
    #[arg(long, short = 'e')]
    pub effective: bool,
}

/// Arguments for creating a profile.
///
/// # Examples
///
/// ```bash
/// gkm create "Games" --base 0
/// gkm create "Editor" --window "gvim" --activate-on-focus
/// ```
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Profile name
    pub name: String,

    /// Base profile to inherit macros from
    #[arg(long)]
    pub base: Option<u64>,

    /// Window title that activates the profile
    #[arg(long)]
    pub window: Option<String>,

    /// Activate when the window gains focus
    #[arg(long)]
    pub activate_on_focus: bool,

    #[arg(long)]
    pub author: Option<String>,

    /// Icon image path
    #[arg(long)]
    pub icon: Option<PathBuf>,

    /// Write the 1.0 file layout
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Profile id
    pub id: u64,
}

#[derive(Parser, Debug)]
pub struct ActivateArgs {
    /// Profile id
    pub id: u64,
}

#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Unlock instead
    #[arg(long)]
    pub off: bool,
}

/// Arguments for binding a macro.
///
/// # Examples
///
/// ```bash
/// gkm add-macro g1 --name "Greeting" --type simple --payload "hello"
/// gkm add-macro g2_g3 --bank 2 --type keyboard --payload KEY_A --repeat-mode toggle
/// ```
#[derive(Parser, Debug)]
pub struct AddMacroArgs {
    /// Key combination, e.g. "g1" or "g1_g2"
    pub keys: String,

    /// Profile id (default: the active profile)
    #[arg(long, short = 'p')]
    pub profile: Option<u64>,

    /// Memory bank (1-3)
    #[arg(long, short = 'b', default_value = "1")]
    pub bank: Bank,

    /// Macro name
    #[arg(long, short = 'n', default_value = "")]
    pub name: String,

    /// Macro type: command, simple, script, action, mouse, keyboard, joystick, digital-joystick
    #[arg(long = "type", short = 't', default_value = "script")]
    pub kind: String,

    /// Command line, text, script or mapped key name
    #[arg(long, default_value = "")]
    pub payload: String,

    /// Repeat mode: held, toggle or none
    #[arg(long, default_value = "held")]
    pub repeat_mode: RepeatMode,

    /// Seconds between repeats (-1 for the profile default)
    #[arg(long, allow_negative_numbers = true)]
    pub repeat_delay: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct MacroKeysArgs {
    /// Key combination, e.g. "g1" or "g1_g2"
    pub keys: String,

    /// Profile id (default: the active profile)
    #[arg(long, short = 'p')]
    pub profile: Option<u64>,

    /// Memory bank (1-3)
    #[arg(long, short = 'b', default_value = "1")]
    pub bank: Bank,
}

#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// Channel: gm (G/M keys), nav (display keys) or mm (multimedia)
    pub channel: Channel,

    /// Packet bytes in hex, e.g. 02010040
    pub hex: String,
}

/// Arguments for replaying a packet script.
///
/// Each line holds `<channel> <hex>`; `#` starts a comment.
///
/// ```text
/// # press G1, release
/// gm 02010040
/// gm 02000040
/// ```
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Script file ("-" for stdin)
    pub script: PathBuf,

    /// Skip the multimedia channel
    #[arg(long)]
    pub no_multimedia: bool,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Profile id
    pub id: u64,

    /// Archive to write
    pub archive: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Archive to read
    pub archive: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
