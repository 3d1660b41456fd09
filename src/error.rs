//! Error types for key decoding and macro profile operations.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for the macro engine.
#[derive(Error, Debug)]
pub enum GkError {
    // Packet errors
    #[error("Malformed {channel} packet: {reason} (data: {data})")]
    MalformedPacket {
        channel: &'static str,
        reason: String,
        data: String,
    },

    #[error("Unknown bit pattern {residual:#08x} in {channel} packet (data: {data})")]
    UnknownBitPattern {
        channel: &'static str,
        residual: u32,
        data: String,
    },

    #[error("Device read failed: {0}")]
    DeviceRead(String),

    // Macro errors
    #[error("Keys '{keys}' are already bound in memory bank M{bank}")]
    DuplicateKeyCombination { bank: u8, keys: String },

    #[error("No macro bound to '{keys}' in memory bank M{bank}")]
    MacroNotFound { bank: u8, keys: String },

    #[error("Invalid memory bank {value}: must be 1-3")]
    InvalidBank { value: u8 },

    #[error("Unknown key name '{name}'")]
    UnknownKey { name: String },

    #[error("Unknown macro type '{name}'")]
    UnknownMacroType { name: String },

    // Profile errors
    #[error("Profile {id} not found for device '{device}'")]
    ProfileNotFound { device: String, id: u64 },

    #[error("Base profile chain loops back to profile {id}: {chain:?}")]
    CyclicBaseProfile { id: u64, chain: Vec<u64> },

    #[error("Corrupt profile file {}: line {line}: {reason}", path.display())]
    CorruptProfileStore {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to write {}: {reason}", path.display())]
    StorageWriteFailure { path: PathBuf, reason: String },

    #[error("Profile has no id assigned")]
    UnassignedProfile,

    #[error("Profile archive error: {0}")]
    Archive(String),

    // Configuration errors
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl GkError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKeyCombination { .. }
                | Self::MacroNotFound { .. }
                | Self::InvalidBank { .. }
                | Self::UnknownKey { .. }
                | Self::UnknownMacroType { .. }
                | Self::ProfileNotFound { .. }
                | Self::CyclicBaseProfile { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DuplicateKeyCombination { .. } => {
                Some("Remove the existing macro first: gkm remove-macro")
            }
            Self::InvalidBank { .. } => Some("Use a memory bank between 1 and 3"),
            Self::UnknownKey { .. } => Some("Key names look like g1, m2, mr, light, up, play"),
            Self::ProfileNotFound { .. } => Some("Run: gkm profiles"),
            Self::CyclicBaseProfile { .. } => {
                Some("Point one of the profiles in the chain at no base profile")
            }
            Self::CorruptProfileStore { .. } => {
                Some("Fix or delete the profile file; it is plain key=value text")
            }
            _ => None,
        }
    }

    /// True for packet-level errors the receiver discards and keeps polling.
    pub const fn is_packet_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedPacket { .. } | Self::UnknownBitPattern { .. }
        )
    }
}

/// Convenience type alias for Results using GkError.
pub type Result<T> = std::result::Result<T, GkError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| GkError::Other(format!("{}: {e}", f().into())))
    }
}
