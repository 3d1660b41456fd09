//! Field layout of profile files, for both schema versions.
//!
//! Profile metadata lives in `[DEFAULT]`. Each bank section `[m1]`..`[m3]`
//! holds an optional `backlight_color` and, per macro, options named
//! `keys_<combination>_<field>`.
//!
//! | Field | Legacy (1.0) | Compact (2.0) |
//! |-------|--------------|---------------|
//! | `type` | type name, or `mapped-to-key` for device mappings | type name |
//! | payload | `command` / `simplemacro` / `macro` / `action`, or `maptype` + `mappedkey` | `macro` |
//!
//! A file with no `version` is legacy. Only the payload field matching the
//! macro's type is written; the others are removed so no stale payload
//! survives a type change.

use serde::Serialize;
use tracing::{trace, warn};

use super::ini::{IniDocument, Section};
use super::model::{
    Bank, DEFAULT_KEY_DELAY_MS, DEFAULT_REPEAT_DELAY, Macro, MacroAction, Profile, RepeatMode, Rgb,
};
use crate::device::DeviceInfo;
use crate::keys::Key;

const NAME: &str = "name";
const TYPE: &str = "type";
const REPEAT_MODE: &str = "repeatmode";
const REPEAT_DELAY: &str = "repeatdelay";
const MACRO: &str = "macro";
const COMMAND: &str = "command";
const SIMPLE_MACRO: &str = "simplemacro";
const ACTION: &str = "action";
const MAP_TYPE: &str = "maptype";
const MAPPED_KEY: &str = "mappedkey";

/// Legacy `type` value for device mappings.
pub const MAPPED_TO_KEY: &str = "mapped-to-key";

/// Fields that can carry a payload in one version or the other.
const PAYLOAD_FIELDS: [&str; 6] = [MACRO, COMMAND, SIMPLE_MACRO, ACTION, MAP_TYPE, MAPPED_KEY];

/// Every field a macro owns.
const MACRO_FIELDS: [&str; 10] = [
    NAME,
    TYPE,
    REPEAT_MODE,
    REPEAT_DELAY,
    MACRO,
    COMMAND,
    SIMPLE_MACRO,
    ACTION,
    MAP_TYPE,
    MAPPED_KEY,
];

const BACKLIGHT_COLOR: &str = "backlight_color";
const MACRO_PREFIX: &str = "keys_";
const NAME_SUFFIX: &str = "_name";

/// Profile file schema version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVersion {
    /// 1.0: per-type payload fields
    Legacy,
    /// 2.0: one unified payload field
    #[default]
    Compact,
}

impl SchemaVersion {
    /// Text written to the `version` option.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "1.0",
            Self::Compact => "2.0",
        }
    }

    /// Interpret a `version` value. Anything but 1.0 is compact.
    pub fn from_value(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Legacy;
        };
        match value.trim().parse::<f64>() {
            Ok(v) if (v - 1.0).abs() < f64::EPSILON => Self::Legacy,
            Ok(_) => Self::Compact,
            Err(_) => {
                warn!(version = value, "Unreadable profile version, assuming legacy");
                Self::Legacy
            }
        }
    }
}

/// Payload option for a non-mapped type in the legacy layout.
const fn legacy_payload_field(action: &MacroAction) -> Option<&'static str> {
    match action {
        MacroAction::Command(_) => Some(COMMAND),
        MacroAction::Simple(_) => Some(SIMPLE_MACRO),
        MacroAction::Script(_) => Some(MACRO),
        MacroAction::Action(_) => Some(ACTION),
        MacroAction::Mapped { .. } => None,
    }
}

fn option(combination: &str, field: &str) -> String {
    format!("{MACRO_PREFIX}{combination}_{field}")
}

/// Combinations with a `keys_<combination>_name` marker, in file order.
pub fn macro_combinations(section: &Section) -> Vec<String> {
    section
        .options()
        .filter_map(|o| o.strip_prefix(MACRO_PREFIX)?.strip_suffix(NAME_SUFFIX))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read one macro. Returns `None` when it cannot be represented (unknown
/// key names or type); its entries are left untouched in the document.
pub fn load_macro(
    section: &Section,
    bank: Bank,
    combination: &str,
    version: SchemaVersion,
) -> Option<Macro> {
    let get = |field: &str| section.get(&option(combination, field));

    let keys = match combination
        .split('_')
        .map(str::parse::<Key>)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(keys) => keys,
        Err(e) => {
            warn!(bank = %bank, combination, error = %e, "Skipping macro with unknown key");
            return None;
        }
    };

    let mut type_name = get(TYPE).map_or("script", str::trim).to_string();
    let mut payload = get(MACRO).unwrap_or_default().to_string();
    if type_name == MAPPED_TO_KEY {
        payload = get(MAPPED_KEY).unwrap_or_default().to_string();
        type_name = get(MAP_TYPE).map(str::trim).unwrap_or_default().to_string();
    } else if version == SchemaVersion::Legacy {
        let field = match type_name.as_str() {
            "command" => Some(COMMAND),
            "simple" => Some(SIMPLE_MACRO),
            "action" => Some(ACTION),
            _ => None,
        };
        if let Some(field) = field {
            payload = get(field).unwrap_or_default().to_string();
        }
    }

    let action = match MacroAction::from_parts(&type_name, payload) {
        Ok(action) => action,
        Err(e) => {
            warn!(bank = %bank, combination, error = %e, "Skipping macro with unknown type");
            return None;
        }
    };

    let mut m = Macro::new(bank, keys, get(NAME).unwrap_or_default(), action);
    m.repeat_mode = get(REPEAT_MODE)
        .and_then(|v| {
            v.parse::<RepeatMode>()
                .inspect_err(|e| warn!(combination, error = %e, "Using default repeat mode"))
                .ok()
        })
        .unwrap_or_default();
    m.repeat_delay = get(REPEAT_DELAY)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(DEFAULT_REPEAT_DELAY);
    trace!(bank = %bank, combination, kind = m.action.type_name(), "Loaded macro");
    Some(m)
}

/// Write one macro's entries into its bank section.
pub fn store_macro(section: &mut Section, m: &Macro, version: SchemaVersion) {
    let combination = m.combination();
    let key = |field: &str| option(&combination, field);

    section.set(&key(NAME), m.name.as_str());
    section.set(&key(TYPE), m.action.type_name());
    section.set(&key(REPEAT_DELAY), format!("{:?}", m.repeat_delay));
    section.set(&key(REPEAT_MODE), m.repeat_mode.as_str());

    let keep: &[&str] = match version {
        SchemaVersion::Legacy => match &m.action {
            MacroAction::Mapped { device, key: mapped } => {
                section.set(&key(TYPE), MAPPED_TO_KEY);
                section.set(&key(MAP_TYPE), device.type_name());
                section.set(&key(MAPPED_KEY), mapped.as_str());
                &[MAP_TYPE, MAPPED_KEY]
            }
            other => {
                let field = legacy_payload_field(other).unwrap_or(MACRO);
                section.set(&key(field), other.payload());
                match field {
                    COMMAND => &[COMMAND],
                    SIMPLE_MACRO => &[SIMPLE_MACRO],
                    ACTION => &[ACTION],
                    _ => &[MACRO],
                }
            }
        },
        SchemaVersion::Compact => {
            section.set(&key(MACRO), m.action.payload());
            &[MACRO]
        }
    };

    for field in PAYLOAD_FIELDS.into_iter().filter(|f| !keep.contains(f)) {
        section.remove(&key(field));
    }
}

/// Remove the entries of one combination. Returns how many went.
///
/// Only the macro's own fields are touched, so `keys_g1_` never reaches
/// into `keys_g1_g2_*`.
pub(crate) fn forget_macro(section: &mut Section, combination: &str) -> usize {
    MACRO_FIELDS
        .into_iter()
        .filter_map(|field| section.remove(&option(combination, field)))
        .count()
}

fn text(section: &Section, name: &str) -> String {
    section.get(name).map(str::trim).unwrap_or_default().to_string()
}

fn int<T: std::str::FromStr>(section: &Section, name: &str, default: T) -> T {
    section
        .get(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Build a profile from a parsed document.
pub fn profile_from_document(device: DeviceInfo, id: Option<u64>, document: IniDocument) -> Profile {
    let defaults = document.defaults();
    let version = SchemaVersion::from_value(defaults.get("version"));

    let mut profile = Profile::new(device, text(defaults, "name"));
    profile.id = id;
    profile.version = version;
    profile.icon = text(defaults, "icon");
    profile.background = text(defaults, "background");
    profile.author = text(defaults, "author");
    profile.window_name = text(defaults, "window_name");
    profile.activate_on_focus = defaults.get_bool("activate_on_focus").unwrap_or(false);
    profile.send_delays = defaults.get_bool("send_delays").unwrap_or(false);
    profile.fixed_delays = defaults.get_bool("fixed_delays").unwrap_or(false);
    profile.press_delay = int(defaults, "press_delay", DEFAULT_KEY_DELAY_MS);
    profile.release_delay = int(defaults, "release_delay", DEFAULT_KEY_DELAY_MS);
    profile.base_profile = u64::try_from(int::<i64>(defaults, "base_profile", -1)).ok();

    for bank in Bank::ALL {
        let Some(section) = document.section(&bank.section_name()) else {
            continue;
        };
        profile.set_bank_color(
            bank,
            section.get(BACKLIGHT_COLOR).and_then(|v| {
                v.parse::<Rgb>()
                    .inspect_err(|e| warn!(bank = %bank, error = %e, "Ignoring backlight colour"))
                    .ok()
            }),
        );
        for m in macro_combinations(section)
            .iter()
            .filter_map(|c| load_macro(section, bank, c, version))
        {
            let combination = m.combination();
            // A later spelling of a bound key set, or a repeated key, stays in the file only
            if let Err(e) = profile.add_macro(m) {
                warn!(bank = %bank, combination, error = %e, "Skipping macro");
            }
        }
    }

    profile.document = document;
    profile
}

fn bool_text(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Render a profile into a document, keeping entries it does not own.
///
/// Macros are written in display order.
pub fn profile_to_document(profile: &Profile) -> IniDocument {
    let mut document = profile.document.clone();

    let defaults = document.defaults_mut();
    defaults.set("name", profile.name.as_str());
    defaults.set("version", profile.version.as_str());
    defaults.set("icon", profile.icon.as_str());
    defaults.set("window_name", profile.window_name.as_str());
    defaults.set(
        "base_profile",
        profile
            .base_profile
            .map_or_else(|| "-1".to_string(), |id| id.to_string()),
    );
    defaults.set("background", profile.background.as_str());
    defaults.set("author", profile.author.as_str());
    defaults.set("activate_on_focus", bool_text(profile.activate_on_focus));
    defaults.set("send_delays", bool_text(profile.send_delays));
    defaults.set("fixed_delays", bool_text(profile.fixed_delays));
    defaults.set("press_delay", profile.press_delay.to_string());
    defaults.set("release_delay", profile.release_delay.to_string());
    defaults.set("model", profile.device.model.id());

    for bank in Bank::ALL {
        let section = document.section_mut(&bank.section_name());
        match profile.bank_color(bank) {
            Some(color) => section.set(BACKLIGHT_COLOR, color.to_string()),
            None => {
                section.remove(BACKLIGHT_COLOR);
            }
        }
        for m in super::resolve::sorted_macros(profile, bank) {
            store_macro(section, m, profile.version);
        }
    }

    document
}
