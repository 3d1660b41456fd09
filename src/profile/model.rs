//! In-memory macro profiles.
//!
//! A [`Profile`] owns three memory banks of [`Macro`]s. Every macro in a
//! bank is bound to a distinct, unordered key combination; operations that
//! would break this fail with [`GkError::DuplicateKeyCombination`] before
//! anything is changed.
//!
//! Persistence lives in [`ProfileStore`](super::store::ProfileStore); the
//! methods here only change the in-memory profile.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::ini::IniDocument;
use super::schema::{self, SchemaVersion};
use crate::device::DeviceInfo;
use crate::error::{GkError, Result};
use crate::keys::{Key, KeySet, combination_key};

/// Repeat delay meaning "use the default".
pub const DEFAULT_REPEAT_DELAY: f64 = -1.0;

/// Press and release delay for new profiles, in milliseconds.
pub const DEFAULT_KEY_DELAY_MS: u32 = 50;

/// Id of the default profile every device has.
pub const DEFAULT_PROFILE_ID: u64 = 0;

/// A memory bank, M1 to M3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub struct Bank(u8);

impl Bank {
    pub const M1: Self = Self(1);
    pub const M2: Self = Self(2);
    pub const M3: Self = Self(3);
    pub const ALL: [Self; 3] = [Self::M1, Self::M2, Self::M3];

    /// Validate a bank number.
    pub fn new(number: u8) -> Result<Self> {
        match number {
            1..=3 => Ok(Self(number)),
            _ => Err(GkError::InvalidBank { value: number }),
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    /// Name of the profile section holding this bank.
    pub fn section_name(self) -> String {
        format!("m{}", self.0)
    }

    /// The M-key that selects this bank.
    pub const fn key(self) -> Key {
        match self.0 {
            1 => Key::M1,
            2 => Key::M2,
            _ => Key::M3,
        }
    }

    const fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl From<Bank> for u8 {
    fn from(bank: Bank) -> Self {
        bank.0
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

impl FromStr for Bank {
    type Err = GkError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches(['m', 'M']);
        let number = digits.parse::<u8>().map_err(|_| GkError::InvalidBank { value: 0 })?;
        Self::new(number)
    }
}

/// Virtual input device a mapped macro drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappedDevice {
    Mouse,
    Keyboard,
    Joystick,
    DigitalJoystick,
}

impl MappedDevice {
    pub const ALL: [Self; 4] = [
        Self::Mouse,
        Self::Keyboard,
        Self::Joystick,
        Self::DigitalJoystick,
    ];

    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Mouse => "mouse",
            Self::Keyboard => "keyboard",
            Self::Joystick => "joystick",
            Self::DigitalJoystick => "digital-joystick",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.type_name() == name)
    }
}

/// What a macro does when activated.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroAction {
    /// Shell command line
    Command(String),
    /// Literal key sequence typed as-is
    Simple(String),
    /// Macro script
    Script(String),
    /// Emit `key` on a virtual input device
    Mapped { device: MappedDevice, key: String },
    /// Named action handled by the host application
    Action(String),
}

impl Default for MacroAction {
    fn default() -> Self {
        Self::Script(String::new())
    }
}

impl MacroAction {
    /// Type names accepted by [`MacroAction::from_parts`].
    pub const TYPE_NAMES: [&'static str; 8] = [
        "command",
        "simple",
        "script",
        "mouse",
        "keyboard",
        "joystick",
        "digital-joystick",
        "action",
    ];

    /// Build from a type name and payload.
    pub fn from_parts(type_name: &str, payload: impl Into<String>) -> Result<Self> {
        let payload = payload.into();
        Ok(match type_name {
            "command" => Self::Command(payload),
            "simple" => Self::Simple(payload),
            "script" => Self::Script(payload),
            "action" => Self::Action(payload),
            other => Self::Mapped {
                device: MappedDevice::from_type_name(other).ok_or_else(|| {
                    GkError::UnknownMacroType {
                        name: other.to_string(),
                    }
                })?,
                key: payload,
            },
        })
    }

    /// Type name as written in profile files.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Simple(_) => "simple",
            Self::Script(_) => "script",
            Self::Mapped { device, .. } => device.type_name(),
            Self::Action(_) => "action",
        }
    }

    /// Payload text regardless of type.
    pub fn payload(&self) -> &str {
        match self {
            Self::Command(s) | Self::Simple(s) | Self::Script(s) | Self::Action(s) => s,
            Self::Mapped { key, .. } => key,
        }
    }

    /// True for input-device mappings.
    pub const fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }
}

impl Serialize for MacroAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MacroAction", 2)?;
        s.serialize_field("type", self.type_name())?;
        s.serialize_field("payload", self.payload())?;
        s.end()
    }
}

/// How a macro behaves while its keys stay down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Each press starts or stops repetition
    Toggle,
    /// Fire once per press
    None,
    /// Repeat until the keys are released
    #[default]
    WhileHeld,
}

impl RepeatMode {
    /// Name as written in profile files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::None => "none",
            Self::WhileHeld => "held",
        }
    }
}

impl FromStr for RepeatMode {
    type Err = GkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => Ok(Self::Toggle),
            "none" => Ok(Self::None),
            "held" | "while-held" => Ok(Self::WhileHeld),
            other => Err(GkError::ConfigInvalid(format!("Unknown repeat mode '{other}'"))),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binding from a key combination in one bank to an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macro {
    bank: Bank,
    keys: Vec<Key>,
    pub name: String,
    pub action: MacroAction,
    pub repeat_mode: RepeatMode,
    /// Seconds between repeats, or [`DEFAULT_REPEAT_DELAY`]
    pub repeat_delay: f64,
}

impl Macro {
    /// Create a macro with default repeat settings.
    pub fn new(bank: Bank, keys: Vec<Key>, name: impl Into<String>, action: MacroAction) -> Self {
        Self {
            bank,
            keys,
            name: name.into(),
            action,
            repeat_mode: RepeatMode::default(),
            repeat_delay: DEFAULT_REPEAT_DELAY,
        }
    }

    pub const fn bank(&self) -> Bank {
        self.bank
    }

    /// Activating keys, in the order they were bound.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Activating keys as a set.
    pub fn key_set(&self) -> KeySet {
        self.keys.iter().copied().collect()
    }

    /// Underscore-joined combination naming this macro's profile entries.
    pub fn combination(&self) -> String {
        combination_key(&self.keys)
    }

    /// True if `keys` is exactly this macro's combination.
    pub fn matches(&self, keys: &KeySet) -> bool {
        self.key_set() == *keys
    }

    /// Whether the repeat delay is the unset sentinel.
    pub fn uses_default_delay(&self) -> bool {
        self.repeat_delay < 0.0
    }
}

/// Backlight colour for a memory bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = GkError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let invalid = || GkError::ConfigInvalid(format!("Invalid colour '{s}': expected r,g,b"));
        if parts.len() < 3 {
            return Err(invalid());
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| invalid());
        Ok(Self(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

/// A named set of three macro banks for one device.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    /// `None` until first saved
    pub id: Option<u64>,
    #[serde(skip)]
    pub device: DeviceInfo,
    pub name: String,
    pub icon: String,
    pub background: String,
    pub author: String,
    pub window_name: String,
    pub activate_on_focus: bool,
    pub send_delays: bool,
    pub fixed_delays: bool,
    pub press_delay: u32,
    pub release_delay: u32,
    pub base_profile: Option<u64>,
    pub version: SchemaVersion,
    banks: [Vec<Macro>; 3],
    colors: [Option<Rgb>; 3],
    /// Document the profile was loaded from; unknown entries survive re-save
    #[serde(skip)]
    pub(crate) document: IniDocument,
}

impl Profile {
    /// Create an unsaved profile in the compact format.
    pub fn new(device: DeviceInfo, name: impl Into<String>) -> Self {
        Self {
            id: None,
            device,
            name: name.into(),
            icon: String::new(),
            background: String::new(),
            author: String::new(),
            window_name: String::new(),
            activate_on_focus: false,
            send_delays: false,
            fixed_delays: false,
            press_delay: DEFAULT_KEY_DELAY_MS,
            release_delay: DEFAULT_KEY_DELAY_MS,
            base_profile: None,
            version: SchemaVersion::Compact,
            banks: Default::default(),
            colors: [None; 3],
            document: IniDocument::new(),
        }
    }

    /// Create an unsaved profile with a fixed id.
    pub fn with_id(device: DeviceInfo, id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::new(device, name)
        }
    }

    /// Whether this is the device's default profile.
    pub fn is_default(&self) -> bool {
        self.id == Some(DEFAULT_PROFILE_ID)
    }

    /// Id, or [`GkError::UnassignedProfile`].
    pub fn require_id(&self) -> Result<u64> {
        self.id.ok_or(GkError::UnassignedProfile)
    }

    /// Macros of a bank in insertion order.
    pub fn macros(&self, bank: Bank) -> &[Macro] {
        &self.banks[bank.index()]
    }

    /// Every macro across all banks.
    pub fn all_macros(&self) -> impl Iterator<Item = &Macro> {
        self.banks.iter().flatten()
    }

    pub fn macro_count(&self) -> usize {
        self.banks.iter().map(Vec::len).sum()
    }

    pub const fn bank_color(&self, bank: Bank) -> Option<Rgb> {
        self.colors[bank.index()]
    }

    pub fn set_bank_color(&mut self, bank: Bank, color: Option<Rgb>) {
        self.colors[bank.index()] = color;
    }

    /// Whether another macro in `bank` is bound to exactly `keys`.
    ///
    /// The macro bound to `exclude`, if any, is not counted.
    pub fn are_keys_in_use(&self, bank: Bank, keys: &KeySet, exclude: Option<&KeySet>) -> bool {
        self.macros(bank)
            .iter()
            .filter(|m| exclude.is_none_or(|ex| !m.matches(ex)))
            .any(|m| m.matches(keys))
    }

    /// The macro whose key set is exactly `keys`.
    pub fn get_macro(&self, bank: Bank, keys: &KeySet) -> Option<&Macro> {
        self.macros(bank).iter().find(|m| m.matches(keys))
    }

    /// Mutable access to the macro bound to exactly `keys`.
    ///
    /// Rebinding goes through [`Profile::rebind_macro`].
    pub fn get_macro_mut(&mut self, bank: Bank, keys: &KeySet) -> Option<&mut Macro> {
        self.banks[bank.index()].iter_mut().find(|m| m.matches(keys))
    }

    /// Add a macro to its bank.
    pub fn add_macro(&mut self, m: Macro) -> Result<&Macro> {
        let bank = m.bank();
        check_combination(&m.keys)?;
        if self.are_keys_in_use(bank, &m.key_set(), None) {
            return Err(GkError::DuplicateKeyCombination {
                bank: bank.number(),
                keys: m.combination(),
            });
        }
        debug!(bank = %bank, keys = %m.combination(), name = %m.name, "Adding macro");
        let list = &mut self.banks[bank.index()];
        list.push(m);
        Ok(&list[list.len() - 1])
    }

    /// Build and add a macro.
    pub fn create_macro(
        &mut self,
        bank: Bank,
        keys: Vec<Key>,
        name: impl Into<String>,
        action: MacroAction,
    ) -> Result<&Macro> {
        self.add_macro(Macro::new(bank, keys, name, action))
    }

    /// Remove the macro bound to exactly `keys`, dropping its file entries.
    pub fn delete_macro(&mut self, bank: Bank, keys: &KeySet) -> Result<Macro> {
        let list = &mut self.banks[bank.index()];
        let pos = list
            .iter()
            .position(|m| m.matches(keys))
            .ok_or_else(|| GkError::MacroNotFound {
                bank: bank.number(),
                keys: combination_key(&keys.iter().copied().collect::<Vec<_>>()),
            })?;
        let removed = list.remove(pos);
        self.forget_entries(bank, &removed.combination());
        debug!(bank = %bank, keys = %removed.combination(), "Deleted macro");
        Ok(removed)
    }

    /// Bind the macro on `from` to the keys `to`.
    pub fn rebind_macro(&mut self, bank: Bank, from: &KeySet, to: Vec<Key>) -> Result<&Macro> {
        check_combination(&to)?;
        let target: KeySet = to.iter().copied().collect();
        if self.are_keys_in_use(bank, &target, Some(from)) {
            return Err(GkError::DuplicateKeyCombination {
                bank: bank.number(),
                keys: combination_key(&to),
            });
        }
        let old = self
            .get_macro(bank, from)
            .map(Macro::combination)
            .ok_or_else(|| GkError::MacroNotFound {
                bank: bank.number(),
                keys: combination_key(&from.iter().copied().collect::<Vec<_>>()),
            })?;
        self.forget_entries(bank, &old);

        let list = &mut self.banks[bank.index()];
        let pos = list.iter().position(|m| m.matches(from)).unwrap_or_default();
        list[pos].keys = to;
        debug!(bank = %bank, from = %old, to = %list[pos].combination(), "Rebound macro");
        Ok(&list[pos])
    }

    /// Drop the stored entries of a combination from the bank's section.
    fn forget_entries(&mut self, bank: Bank, combination: &str) {
        schema::forget_macro(self.document.section_mut(&bank.section_name()), combination);
    }

}

/// A combination needs at least one key and no key twice.
fn check_combination(keys: &[Key]) -> Result<()> {
    if keys.is_empty() {
        return Err(GkError::Other("A macro needs at least one key".to_string()));
    }
    let unique: KeySet = keys.iter().copied().collect();
    if unique.len() != keys.len() {
        return Err(GkError::Other(format!(
            "Key repeated in '{}'",
            combination_key(keys)
        )));
    }
    Ok(())
}
