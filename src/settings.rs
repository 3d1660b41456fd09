//! Per-device settings: the active profile and the profile lock.
//!
//! The engine never reads settings files directly. It goes through
//! [`SettingsStore`], so a desktop session service or an in-memory map
//! can stand in for the TOML file the binary uses.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::device::DeviceInfo;
use crate::error::{GkError, Result};
use crate::profile::store::write_atomic;
use crate::profile::{DEFAULT_PROFILE_ID, Profile, ProfileStore};

/// File name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Key/value settings scoped by device uid.
pub trait SettingsStore: Send + Sync {
    /// The selected profile id, if one was ever chosen.
    fn active_profile_id(&self, device: &str) -> Result<Option<u64>>;

    fn set_active_profile_id(&self, device: &str, id: u64) -> Result<()>;

    /// Whether profile switching is locked for the device.
    fn is_locked(&self, device: &str) -> Result<bool>;

    fn set_locked(&self, device: &str, locked: bool) -> Result<()>;
}

/// Settings for one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<u64>,
    #[serde(default)]
    pub locked: bool,
}

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct MemorySettings {
    devices: Mutex<HashMap<String, DeviceSettings>>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, device: &str) -> DeviceSettings {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device)
            .copied()
            .unwrap_or_default()
    }

    fn update(&self, device: &str, f: impl FnOnce(&mut DeviceSettings)) {
        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        f(devices.entry(device.to_string()).or_default());
    }
}

impl SettingsStore for MemorySettings {
    fn active_profile_id(&self, device: &str) -> Result<Option<u64>> {
        Ok(self.get(device).active_profile)
    }

    fn set_active_profile_id(&self, device: &str, id: u64) -> Result<()> {
        self.update(device, |s| s.active_profile = Some(id));
        Ok(())
    }

    fn is_locked(&self, device: &str) -> Result<bool> {
        Ok(self.get(device).locked)
    }

    fn set_locked(&self, device: &str, locked: bool) -> Result<()> {
        self.update(device, |s| s.locked = locked);
        Ok(())
    }
}

/// Settings kept in a TOML file, one table per device uid.
///
/// ```toml
/// [g19]
/// active_profile = 1700000000
/// locked = false
/// ```
///
/// The file is read on every query and rewritten atomically on every
/// change, so several processes see each other's updates.
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `<config dir>/settings.toml`.
    pub fn in_config_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every device's settings. A missing file is an empty table.
    pub fn read_all(&self) -> Result<BTreeMap<String, DeviceSettings>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text)
            .map_err(|e| GkError::Settings(format!("{}: {e}", self.path.display())))
    }

    fn get(&self, device: &str) -> Result<DeviceSettings> {
        Ok(self.read_all()?.remove(device).unwrap_or_default())
    }

    fn update(&self, device: &str, f: impl FnOnce(&mut DeviceSettings)) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all = self.read_all()?;
        f(all.entry(device.to_string()).or_default());
        let text = toml::to_string_pretty(&all).map_err(|e| GkError::Settings(e.to_string()))?;
        write_atomic(&self.path, text.as_bytes())?;
        debug!(device, path = %self.path.display(), "Settings written");
        Ok(())
    }
}

impl SettingsStore for TomlSettingsStore {
    fn active_profile_id(&self, device: &str) -> Result<Option<u64>> {
        Ok(self.get(device)?.active_profile)
    }

    fn set_active_profile_id(&self, device: &str, id: u64) -> Result<()> {
        self.update(device, |s| s.active_profile = Some(id))
    }

    fn is_locked(&self, device: &str) -> Result<bool> {
        Ok(self.get(device)?.locked)
    }

    fn set_locked(&self, device: &str, locked: bool) -> Result<()> {
        self.update(device, |s| s.locked = locked)
    }
}

/// Load the device's active profile.
///
/// Falls back to the default profile (creating it if needed) when no
/// profile was selected or the selected one no longer exists.
pub fn active_profile(
    store: &ProfileStore,
    settings: &dyn SettingsStore,
    device: &DeviceInfo,
) -> Result<Profile> {
    if let Some(id) = settings.active_profile_id(&device.uid)? {
        match store.load(device, id) {
            Ok(profile) => return Ok(profile),
            Err(GkError::ProfileNotFound { .. }) => {
                warn!(device = %device.uid, id, "Active profile missing, using default");
            }
            Err(e) => return Err(e),
        }
    }
    store.create_default(device)
}

/// Select a profile, unless the device is locked.
///
/// Returns `false` when the lock prevented the switch.
pub fn activate_profile(
    store: &ProfileStore,
    settings: &dyn SettingsStore,
    device: &DeviceInfo,
    id: u64,
) -> Result<bool> {
    if settings.is_locked(&device.uid)? {
        warn!(device = %device.uid, id, "Profile locked, not switching");
        return Ok(false);
    }
    if id == DEFAULT_PROFILE_ID {
        store.create_default(device)?;
    } else if !store.exists(device, id) {
        return Err(GkError::ProfileNotFound {
            device: device.uid.clone(),
            id,
        });
    }
    settings.set_active_profile_id(&device.uid, id)?;
    info!(device = %device.uid, id, "Activated profile");
    Ok(true)
}
