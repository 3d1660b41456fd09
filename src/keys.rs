//! Key code table for G-series auxiliary keys.
//!
//! Every physical key the engine knows about is a [`Key`]. Keys are grouped
//! by the input channel that reports them, and each channel has a table
//! mapping raw bit values to keys.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GkError;

/// A set of keys, ordered by declaration order of [`Key`].
pub type KeySet = BTreeSet<Key>;

/// Logical identifier of one physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Key {
    // Macro and memory keys
    Light,
    M1,
    M2,
    M3,
    Mr,
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
    G8,
    G9,
    G10,
    G11,
    G12,
    G13,
    G14,
    G15,
    G16,
    G17,
    G18,
    // LCD soft keys on smaller-display models
    L1,
    L2,
    L3,
    L4,
    L5,
    // Display navigation keys
    Back,
    Down,
    Left,
    Menu,
    Ok,
    Right,
    Settings,
    Up,
    // Multimedia keys
    WinKey,
    Next,
    Prev,
    Stop,
    Play,
    Mute,
    ScrollUp,
    ScrollDown,
}

/// Every key, in declaration order.
pub const ALL_KEYS: [Key; 44] = [
    Key::Light,
    Key::M1,
    Key::M2,
    Key::M3,
    Key::Mr,
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
    Key::L1,
    Key::L2,
    Key::L3,
    Key::L4,
    Key::L5,
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

/// Which group of keys a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyGroup {
    /// G-keys, M1-M3, MR, the light switch and L-keys.
    MacroMemory,
    /// Keys next to the display.
    Navigation,
    /// Media keys and the winkey toggle.
    Multimedia,
}

/// Input channel a raw packet arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    MacroMemory,
    Navigation,
    Multimedia,
}

impl Channel {
    /// Short name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MacroMemory => "macro/memory",
            Self::Navigation => "navigation",
            Self::Multimedia => "multimedia",
        }
    }
}

impl FromStr for Channel {
    type Err = GkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gm" | "macro" | "memory" | "macro-memory" => Ok(Self::MacroMemory),
            "d" | "nav" | "navigation" | "display" => Ok(Self::Navigation),
            "mm" | "media" | "multimedia" => Ok(Self::Multimedia),
            other => Err(GkError::Other(format!("Unknown channel '{other}'"))),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Macro/memory channel bit values, as laid out in bytes 1-3 of the packet.
pub const MACRO_MEMORY_BITS: [(u32, Key); 17] = [
    (0x00_0001, Key::G1),
    (0x00_0002, Key::G2),
    (0x00_0004, Key::G3),
    (0x00_0008, Key::G4),
    (0x00_0010, Key::G5),
    (0x00_0020, Key::G6),
    (0x00_0040, Key::G7),
    (0x00_0080, Key::G8),
    (0x00_0100, Key::G9),
    (0x00_0200, Key::G10),
    (0x00_0400, Key::G11),
    (0x00_0800, Key::G12),
    (0x00_1000, Key::M1),
    (0x00_2000, Key::M2),
    (0x00_4000, Key::M3),
    (0x00_8000, Key::Mr),
    (0x08_0000, Key::Light),
];

/// Residual macro/memory mask once every pressed key has been cleared.
pub const MACRO_MEMORY_EMPTY: u32 = 0x40_0000;

/// Navigation channel bit values (byte 0 of the packet).
pub const NAVIGATION_BITS: [(u8, Key); 8] = [
    (0x01, Key::Settings),
    (0x02, Key::Back),
    (0x04, Key::Menu),
    (0x08, Key::Ok),
    (0x10, Key::Right),
    (0x20, Key::Left),
    (0x40, Key::Down),
    (0x80, Key::Up),
];

/// Multimedia channel bit values (byte 1 of a `0x01` packet).
pub const MULTIMEDIA_BITS: [(u8, Key); 7] = [
    (0x01, Key::Next),
    (0x02, Key::Prev),
    (0x04, Key::Stop),
    (0x08, Key::Play),
    (0x10, Key::Mute),
    (0x20, Key::ScrollUp),
    (0x40, Key::ScrollDown),
];

impl Key {
    /// Name used in profile files and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::M1 => "m1",
            Self::M2 => "m2",
            Self::M3 => "m3",
            Self::Mr => "mr",
            Self::G1 => "g1",
            Self::G2 => "g2",
            Self::G3 => "g3",
            Self::G4 => "g4",
            Self::G5 => "g5",
            Self::G6 => "g6",
            Self::G7 => "g7",
            Self::G8 => "g8",
            Self::G9 => "g9",
            Self::G10 => "g10",
            Self::G11 => "g11",
            Self::G12 => "g12",
            Self::G13 => "g13",
            Self::G14 => "g14",
            Self::G15 => "g15",
            Self::G16 => "g16",
            Self::G17 => "g17",
            Self::G18 => "g18",
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::L3 => "l3",
            Self::L4 => "l4",
            Self::L5 => "l5",
            Self::Back => "back",
            Self::Down => "down",
            Self::Left => "left",
            Self::Menu => "menu",
            Self::Ok => "ok",
            Self::Right => "right",
            Self::Settings => "settings",
            Self::Up => "up",
            Self::WinKey => "win",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::Stop => "stop",
            Self::Play => "play",
            Self::Mute => "mute",
            Self::ScrollUp => "scroll-up",
            Self::ScrollDown => "scroll-down",
        }
    }

    /// Group this key is reported in.
    pub const fn group(self) -> KeyGroup {
        match self {
            Self::Back
            | Self::Down
            | Self::Left
            | Self::Menu
            | Self::Ok
            | Self::Right
            | Self::Settings
            | Self::Up => KeyGroup::Navigation,
            Self::WinKey
            | Self::Next
            | Self::Prev
            | Self::Stop
            | Self::Play
            | Self::Mute
            | Self::ScrollUp
            | Self::ScrollDown => KeyGroup::Multimedia,
            _ => KeyGroup::MacroMemory,
        }
    }

    /// Memory bank selected by this key, if it is M1-M3.
    pub const fn memory_bank(self) -> Option<u8> {
        match self {
            Self::M1 => Some(1),
            Self::M2 => Some(2),
            Self::M3 => Some(3),
            _ => None,
        }
    }

    /// G-key number, if this is a G-key.
    pub fn g_number(self) -> Option<u32> {
        self.numbered_suffix('g')
    }

    /// L-key number, if this is an L-key.
    pub fn l_number(self) -> Option<u32> {
        self.numbered_suffix('l')
    }

    fn numbered_suffix(self, prefix: char) -> Option<u32> {
        self.name()
            .strip_prefix(prefix)
            .and_then(|rest| rest.parse().ok())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Key {
    type Err = GkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|k| k.name() == lower)
            .ok_or(GkError::UnknownKey { name: lower })
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name().to_string()
    }
}

impl TryFrom<String> for Key {
    type Error = GkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Keys in the given group.
pub fn keys_in_group(group: KeyGroup) -> impl Iterator<Item = Key> {
    ALL_KEYS.into_iter().filter(move |k| k.group() == group)
}

/// Join keys into the underscore-separated form used in profile files.
pub fn combination_key(keys: &[Key]) -> String {
    keys.iter().map(|k| k.name()).collect::<Vec<_>>().join("_")
}

/// Parse an underscore- or comma-separated key combination.
pub fn parse_combination(s: &str) -> Result<Vec<Key>, GkError> {
    s.split(['_', ',', '+'])
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}
