//! Active profile and lock state kept in the settings file.

use std::fs;
use std::path::Path;

use gkm::error::GkError;
use gkm::paths;
use gkm::profile::{DEFAULT_PROFILE_ID, Profile};
use gkm::settings::{SettingsStore, activate_profile, active_profile};

use crate::common::env::EnvGuard;
use crate::common::fixtures::{DEVICE_UID, TestConfig, g19};
use crate::common::init_test_logging;

#[test]
fn settings_survive_a_new_store_instance() {
    init_test_logging();
    let config = TestConfig::new();
    let first = config.toml_settings();
    first.set_active_profile_id(DEVICE_UID, 5).unwrap();
    first.set_locked(DEVICE_UID, true).unwrap();

    let second = config.toml_settings();
    assert_eq!(second.active_profile_id(DEVICE_UID).unwrap(), Some(5));
    assert!(second.is_locked(DEVICE_UID).unwrap());

    let text = fs::read_to_string(second.path()).unwrap();
    assert!(text.contains("[g19-test]"), "{text}");
    assert!(text.contains("active_profile = 5"), "{text}");
}

#[test]
fn devices_are_independent() {
    init_test_logging();
    let config = TestConfig::new();
    let settings = config.toml_settings();
    settings.set_active_profile_id("left", 1).unwrap();
    settings.set_locked("right", true).unwrap();

    assert_eq!(settings.active_profile_id("left").unwrap(), Some(1));
    assert!(!settings.is_locked("left").unwrap());
    assert_eq!(settings.active_profile_id("right").unwrap(), None);
    assert!(settings.is_locked("right").unwrap());
    assert_eq!(settings.read_all().unwrap().len(), 2);
}

#[test]
fn unreadable_settings_file_is_an_error() {
    init_test_logging();
    let config = TestConfig::new();
    let settings = config.toml_settings();
    fs::write(settings.path(), "[g19-test\nlocked = maybe").unwrap();

    assert!(matches!(
        settings.is_locked(DEVICE_UID),
        Err(GkError::Settings(_))
    ));
}

#[test]
fn lock_blocks_activation() {
    init_test_logging();
    let config = TestConfig::new();
    let settings = config.toml_settings();
    let mut profile = Profile::with_id(g19(), 7, "Seven");
    config.store.save(&mut profile).unwrap();

    settings.set_locked(DEVICE_UID, true).unwrap();
    assert!(!activate_profile(&config.store, &settings, &g19(), 7).unwrap());
    assert_eq!(settings.active_profile_id(DEVICE_UID).unwrap(), None);

    settings.set_locked(DEVICE_UID, false).unwrap();
    assert!(activate_profile(&config.store, &settings, &g19(), 7).unwrap());
    assert_eq!(active_profile(&config.store, &settings, &g19()).unwrap().id, Some(7));
}

#[test]
fn activating_unknown_profile_fails() {
    init_test_logging();
    let config = TestConfig::new();
    let settings = config.toml_settings();
    assert!(matches!(
        activate_profile(&config.store, &settings, &g19(), 404),
        Err(GkError::ProfileNotFound { id: 404, .. })
    ));
    // The default profile is created on demand
    assert!(activate_profile(&config.store, &settings, &g19(), DEFAULT_PROFILE_ID).unwrap());
    assert!(config.store.exists(&g19(), DEFAULT_PROFILE_ID));
}

#[test]
fn deleted_active_profile_falls_back_to_default() {
    init_test_logging();
    let config = TestConfig::new();
    let settings = config.toml_settings();
    let mut profile = Profile::with_id(g19(), 7, "Seven");
    config.store.save(&mut profile).unwrap();
    activate_profile(&config.store, &settings, &g19(), 7).unwrap();

    config.store.delete(&g19(), 7).unwrap();
    let active = active_profile(&config.store, &settings, &g19()).unwrap();
    assert!(active.is_default());
    assert_eq!(active.name, "Default");
}

#[cfg(target_os = "linux")]
#[test]
fn platform_config_dir_is_used_without_override() {
    init_test_logging();
    let config = TestConfig::new();
    let xdg = config.path().to_string_lossy().into_owned();
    let _env = EnvGuard::set("XDG_CONFIG_HOME", &xdg);

    let dir = paths::config_dir(None).unwrap();
    assert_eq!(dir, Path::new(&xdg).join(paths::APP_DIR));
}
