//! Test fixture helpers for profile stores and packet scripts.
//!
//! Every fixture lives in a temporary directory that is removed on drop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gkm::device::{DeviceInfo, DeviceModel};
use gkm::profile::ProfileStore;
use gkm::settings::{MemorySettings, TomlSettingsStore};
use tempfile::TempDir;

/// Device uid used throughout the tests.
pub const DEVICE_UID: &str = "g19-test";

#[must_use]
pub fn g19() -> DeviceInfo {
    DeviceInfo::new(DEVICE_UID, DeviceModel::G19)
}

/// A config directory with a profile store and settings.
pub struct TestConfig {
    pub dir: TempDir,
    pub store: Arc<ProfileStore>,
    pub settings: Arc<MemorySettings>,
}

impl TestConfig {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(ProfileStore::in_config_dir(dir.path()));
        Self {
            dir,
            store,
            settings: Arc::new(MemorySettings::new()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Settings file store in the same directory.
    #[must_use]
    pub fn toml_settings(&self) -> TomlSettingsStore {
        TomlSettingsStore::in_config_dir(self.path())
    }

    /// Write a raw profile file for the test device.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_profile(&self, id: u64, text: &str) -> PathBuf {
        let path = self.store.profile_path(&g19(), id);
        fs::create_dir_all(path.parent().expect("profile path has a parent"))
            .expect("Failed to create device directory");
        fs::write(&path, text).expect("Failed to write profile");
        path
    }

    /// Read back a profile file of the test device.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn read_profile(&self, id: u64) -> String {
        fs::read_to_string(self.store.profile_path(&g19(), id)).expect("Failed to read profile")
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A legacy (1.0) profile as older releases wrote it: no `version`
/// option, type-specific payload fields, a mapped key and an option the
/// current release does not know.
pub const LEGACY_PROFILE: &str = "\
[DEFAULT]
name = Old Games
icon =
window_name = quake
activate_on_focus = True
base_profile = -1
plugin_setting = keep me

[m1]
backlight_color = 255,0,0
keys_g1_name = Fire
keys_g1_type = simple
keys_g1_simplemacro = f
keys_g2_g3_name = Jump
keys_g2_g3_type = mapped-to-key
keys_g2_g3_maptype = keyboard
keys_g2_g3_mappedkey = KEY_SPACE
keys_g2_g3_repeatmode = toggle
keys_g4_name = Launch
keys_g4_type = command
keys_g4_command = xterm
\t-e top

[m2]
keys_g12_name = Later
keys_g12_type = script
keys_g12_macro = Delay 100
";

/// Packet script pressing G1, releasing it, switching to M2 and pressing
/// G1 again, with one malformed packet in between.
pub const REPLAY_SCRIPT: &str = "\
# press and release G1 in M1
gm 02010040
gm 02000040
# junk is discarded
gm 05000040
# select M2, then G1 again
gm 02002040
gm 02000040
gm 02010040
gm 02000040
";
