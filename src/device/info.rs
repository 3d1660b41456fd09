//! Device identity and per-model key tables.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::GkError;
use crate::keys::Key;

/// A keyboard the engine manages profiles for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Stable identifier; names the device's profile directory
    pub uid: String,
    /// Hardware model
    pub model: DeviceModel,
}

impl DeviceInfo {
    /// Create a device description.
    pub fn new(uid: impl Into<String>, model: DeviceModel) -> Self {
        Self {
            uid: uid.into(),
            model,
        }
    }

    /// Physical index of a key on this device, if the device has it.
    pub fn key_index(&self, key: Key) -> Option<usize> {
        self.model.keys().iter().position(|k| *k == key)
    }
}

/// Supported keyboard models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// G19: 12 G-keys, colour LCD with navigation keys, media keys
    G19,
    /// G15 v2: 6 G-keys, mono LCD with L-keys
    G15v2,
    /// G510: 18 G-keys, mono LCD with L-keys, media keys
    G510,
}

const G19_KEYS: &[Key] = &[
    Key::G1,
    Key::G2,
    Key::G3,
    Key::G4,
    Key::G5,
    Key::G6,
    Key::G7,
    Key::G8,
    Key::G9,
    Key::G10,
    Key::G11,
    Key::G12,
    Key::Light,
    Key::M1,
    Key::M2,
    Key::M3,
    Key::Mr,
    Key::Back,
    Key::Down,
    Key::Left,
    Key::Menu,
    Key::Ok,
    Key::Right,
    Key::Settings,
    Key::Up,
    Key::WinKey,
    Key::Next,
    Key::Prev,
    Key::Stop,
    Key::Play,
    Key::Mute,
    Key::ScrollUp,
    Key::ScrollDown,
];

const G15V2_KEYS: &[Key] = &[
    Key::G1,
    Key::G2,
    Key::G3,
    Key::G4,
    Key::G5,
    Key::G6,
    Key::M1,
    Key::M2,
    Key::M3,
    Key::Mr,
    Key::L1,
    Key::L2,
    Key::L3,
    Key::L4,
    Key::L5,
    Key::Light,
];

const G510_KEYS: &[Key] = &[
    Key::G1,
    Key::G2,
    Key::G3,
    Key::G4,
    Key::G5,
    Key::G6,
    Key::G7,
    Key::G8,
    Key::G9,
    Key::G10,
    Key::G11,
    Key::G12,
    Key::G13,
    Key::G14,
    Key::G15,
    Key::G16,
    Key::G17,
    Key::G18,
    Key::M1,
    Key::M2,
    Key::M3,
    Key::Mr,
    Key::L1,
    Key::L2,
    Key::L3,
    Key::L4,
    Key::L5,
    Key::Light,
    Key::WinKey,
    Key::Next,
    Key::Prev,
    Key::Stop,
    Key::Play,
    Key::Mute,
];

impl DeviceModel {
    /// Keys present on this model, in physical layout order.
    #[must_use]
    pub const fn keys(self) -> &'static [Key] {
        match self {
            Self::G19 => G19_KEYS,
            Self::G15v2 => G15V2_KEYS,
            Self::G510 => G510_KEYS,
        }
    }

    /// Model identifier written into profile files.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::G19 => "g19",
            Self::G15v2 => "g15v2",
            Self::G510 => "g510",
        }
    }

    /// Returns a human-readable name for this device model.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::G19 => "Logitech G19",
            Self::G15v2 => "Logitech G15 (v2)",
            Self::G510 => "Logitech G510",
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for DeviceModel {
    type Err = GkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "g19" => Ok(Self::G19),
            "g15v2" | "g15" => Ok(Self::G15v2),
            "g510" => Ok(Self::G510),
            other => Err(GkError::ConfigInvalid(format!(
                "Unknown device model '{other}'"
            ))),
        }
    }
}
