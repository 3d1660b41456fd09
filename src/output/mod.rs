//! Output mode abstraction for robot and human output.

use serde::Serialize;

use crate::cli::Cli;
use crate::engine::EngineEvent;
use crate::error::GkError;
use crate::input::DecodedPacket;
use crate::profile::{Bank, Macro, Profile, ResolvedMacro, Rgb, SchemaVersion};

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

// === Result Types ===

/// One line of `gkm profiles`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub id: Option<u64>,
    pub name: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_profile: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub window_name: String,
    pub macros: usize,
    pub version: SchemaVersion,
}

impl ProfileSummary {
    pub fn new(profile: &Profile, active_id: u64) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            active: profile.id == Some(active_id),
            base_profile: profile.base_profile,
            window_name: profile.window_name.clone(),
            macros: profile.macro_count(),
            version: profile.version,
        }
    }
}

/// Macros of one bank, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct BankListing {
    pub bank: Bank,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlight: Option<Rgb>,
    pub macros: Vec<ResolvedMacro>,
}

/// Output of `gkm show`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetail {
    #[serde(flatten)]
    pub summary: ProfileSummary,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    pub banks: Vec<BankListing>,
}

/// Totals after a replay.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReplaySummary {
    pub packets: usize,
    pub dispatched: usize,
    pub discarded: usize,
    pub activations: usize,
    pub final_bank: u8,
}

/// Build metadata for `gkm version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: bool,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
    pub target: &'static str,
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    /// JSON output for AI agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output; the flag enables color.
    Human { color: bool },
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            Self::Human {
                color: !cli.no_color && console::colors_enabled(),
            }
        }
    }

    /// Returns true if output should be JSON.
    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { color } => Box::new(HumanOutput::new(color)),
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &GkError);
    fn warning(&self, message: &str);

    // Profiles
    fn profile_list(&self, profiles: &[ProfileSummary]);
    fn profile_detail(&self, detail: &ProfileDetail);
    fn profile_saved(&self, profile: &Profile, action: &str);
    fn profile_active(&self, id: u64, switched: bool);
    fn lock_state(&self, device: &str, locked: bool);

    // Macros
    fn macro_saved(&self, bank: Bank, m: &Macro);
    fn macro_removed(&self, bank: Bank, m: &Macro);
    fn resolution(&self, bank: Bank, keys: &str, resolved: Option<&ResolvedMacro>);

    // Key input
    fn decoded(&self, packet: &DecodedPacket);
    fn engine_event(&self, event: &EngineEvent);
    fn replay_summary(&self, summary: &ReplaySummary);

    // Metadata
    fn version_info(&self, info: &VersionInfo);
}
