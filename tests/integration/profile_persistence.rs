//! Profile files on disk: both layouts, unknown entries, archives.

use std::fs;

use gkm::error::GkError;
use gkm::keys::{Key, KeySet};
use gkm::profile::{
    Bank, MacroAction, MappedDevice, Profile, RepeatMode, Rgb, SchemaVersion,
};

use crate::common::fixtures::{LEGACY_PROFILE, TestConfig, g19};
use crate::common::init_test_logging;

fn keys(list: &[Key]) -> KeySet {
    list.iter().copied().collect()
}

#[test]
fn legacy_mapped_key_loads_as_device_mapping() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(
        7,
        "[m1]\nkeys_g1_name = Jump\nkeys_g1_type = mapped-to-key\nkeys_g1_maptype = keyboard\nkeys_g1_mappedkey = 30\n",
    );

    let profile = config.store.load(&g19(), 7).unwrap();
    assert_eq!(profile.version, SchemaVersion::Legacy);
    let m = profile.get_macro(Bank::M1, &keys(&[Key::G1])).unwrap();
    assert_eq!(m.action.type_name(), "keyboard");
    assert_eq!(m.action.payload(), "30");
    assert_eq!(
        m.action,
        MacroAction::Mapped {
            device: MappedDevice::Keyboard,
            key: "30".to_string()
        }
    );
}

#[test]
fn legacy_profile_fields_load() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(3, LEGACY_PROFILE);

    let profile = config.store.load(&g19(), 3).unwrap();
    assert_eq!(profile.id, Some(3));
    assert_eq!(profile.name, "Old Games");
    assert_eq!(profile.window_name, "quake");
    assert!(profile.activate_on_focus);
    assert_eq!(profile.base_profile, None);
    assert_eq!(profile.bank_color(Bank::M1), Some(Rgb(255, 0, 0)));
    assert_eq!(profile.bank_color(Bank::M2), None);

    let fire = profile.get_macro(Bank::M1, &keys(&[Key::G1])).unwrap();
    assert_eq!(fire.action, MacroAction::Simple("f".into()));
    assert_eq!(fire.repeat_mode, RepeatMode::WhileHeld);
    assert!(fire.uses_default_delay());

    let jump = profile.get_macro(Bank::M1, &keys(&[Key::G3, Key::G2])).unwrap();
    assert_eq!(jump.name, "Jump");
    assert_eq!(jump.repeat_mode, RepeatMode::Toggle);

    let launch = profile.get_macro(Bank::M1, &keys(&[Key::G4])).unwrap();
    assert_eq!(launch.action, MacroAction::Command("xterm\n-e top".into()));

    let later = profile.macros(Bank::M2);
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].action, MacroAction::Script("Delay 100".into()));
    assert!(profile.macros(Bank::M3).is_empty());
}

#[test]
fn legacy_profile_is_saved_in_legacy_layout() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(3, LEGACY_PROFILE);

    let mut profile = config.store.load(&g19(), 3).unwrap();
    profile.name = "Renamed".into();
    config.store.save(&mut profile).unwrap();

    let text = config.read_profile(3);
    assert!(text.contains("version = 1.0"));
    assert!(text.contains("name = Renamed"));
    assert!(text.contains("keys_g1_simplemacro = f"));
    assert!(text.contains("keys_g2_g3_type = mapped-to-key"));
    assert!(text.contains("keys_g2_g3_mappedkey = KEY_SPACE"));
    assert!(text.contains("keys_g4_command = xterm\n\t-e top"));
    assert!(!text.contains("keys_g1_macro ="));
    // Options this release does not know survive
    assert!(text.contains("plugin_setting = keep me"));

    let reloaded = config.store.load(&g19(), 3).unwrap();
    assert_eq!(reloaded.macro_count(), profile.macro_count());
}

#[test]
fn converting_to_compact_moves_payloads() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(3, LEGACY_PROFILE);

    let mut profile = config.store.load(&g19(), 3).unwrap();
    profile.version = SchemaVersion::Compact;
    config.store.save(&mut profile).unwrap();

    let text = config.read_profile(3);
    assert!(text.contains("version = 2.0"));
    assert!(text.contains("keys_g1_macro = f"));
    assert!(text.contains("keys_g2_g3_type = keyboard"));
    assert!(text.contains("keys_g2_g3_macro = KEY_SPACE"));
    assert!(!text.contains("simplemacro"));
    assert!(!text.contains("mappedkey"));
    assert!(!text.contains("keys_g4_command"));

    let reloaded = config.store.load(&g19(), 3).unwrap();
    assert_eq!(reloaded.version, SchemaVersion::Compact);
    for bank in Bank::ALL {
        assert_eq!(reloaded.macros(bank), profile.macros(bank), "bank {bank}");
    }
}

#[test]
fn unrepresentable_macros_are_kept_in_the_file() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(
        4,
        "[DEFAULT]\nname = Odd\nversion = 2.0\n\n[m1]\nkeys_g1_name = Ok\nkeys_g1_type = simple\nkeys_g1_macro = a\nkeys_g5_name = Future\nkeys_g5_type = teleport\nkeys_g5_macro = mars\nkeys_q9_name = Ghost\nkeys_q9_type = simple\nkeys_q9_macro = b\n",
    );

    let mut profile = config.store.load(&g19(), 4).unwrap();
    assert_eq!(profile.macro_count(), 1);

    config.store.save(&mut profile).unwrap();
    let text = config.read_profile(4);
    assert!(text.contains("keys_g5_type = teleport"));
    assert!(text.contains("keys_q9_name = Ghost"));
}

#[test]
fn saved_profile_round_trips() {
    init_test_logging();
    let config = TestConfig::new();
    let mut profile = Profile::new(g19(), "Editor");
    profile.author = "someone".into();
    profile.base_profile = Some(0);
    profile.set_bank_color(Bank::M3, Some(Rgb(0, 128, 255)));
    profile
        .create_macro(Bank::M1, vec![Key::G2], "Save", MacroAction::Simple(":w".into()))
        .unwrap();
    let toggle = profile
        .create_macro(
            Bank::M3,
            vec![Key::G1, Key::L2],
            "Fire",
            MacroAction::Mapped {
                device: MappedDevice::Mouse,
                key: "BTN_LEFT".into(),
            },
        )
        .unwrap()
        .key_set();
    profile
        .get_macro_mut(Bank::M3, &toggle)
        .unwrap()
        .repeat_mode = RepeatMode::Toggle;

    let id = config.store.create(&mut profile).unwrap();
    assert!(id > 0);

    let loaded = config.store.load(&g19(), id).unwrap();
    assert_eq!(loaded.name, "Editor");
    assert_eq!(loaded.author, "someone");
    assert_eq!(loaded.base_profile, Some(0));
    assert_eq!(loaded.bank_color(Bank::M3), Some(Rgb(0, 128, 255)));
    assert_eq!(loaded.macros(Bank::M1), profile.macros(Bank::M1));
    assert_eq!(loaded.macros(Bank::M3), profile.macros(Bank::M3));
}

#[test]
fn whitespace_in_names_and_payloads_round_trips() {
    init_test_logging();
    let config = TestConfig::new();
    for (id, version) in [(20, SchemaVersion::Legacy), (21, SchemaVersion::Compact)] {
        let mut profile = Profile::with_id(g19(), id, "Spacing");
        profile.version = version;
        profile
            .create_macro(Bank::M2, vec![Key::G5], " name ", MacroAction::Simple("hello ".into()))
            .unwrap();
        config.store.save(&mut profile).unwrap();

        let loaded = config.store.load(&g19(), id).unwrap();
        assert_eq!(loaded.macros(Bank::M2), profile.macros(Bank::M2), "{version:?}");
    }
}

#[test]
fn removing_a_macro_keeps_entries_of_longer_combinations() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(
        12,
        "[DEFAULT]\nversion = 2.0\n\n[m1]\nkeys_g1_name = One\nkeys_g1_macro = 1\nkeys_g1_q9_name = Ghost\n",
    );
    let mut profile = config.store.load(&g19(), 12).unwrap();
    config
        .store
        .delete_macro(&mut profile, Bank::M1, &keys(&[Key::G1]))
        .unwrap();

    let text = config.read_profile(12);
    assert!(!text.contains("keys_g1_name"), "{text}");
    assert!(text.contains("keys_g1_q9_name = Ghost"), "{text}");
}

#[test]
fn save_leaves_no_temporary_files() {
    init_test_logging();
    let config = TestConfig::new();
    let mut profile = Profile::with_id(g19(), 9, "Tidy");
    for _ in 0..3 {
        config.store.save(&mut profile).unwrap();
    }

    let names: Vec<String> = fs::read_dir(config.store.device_dir(&g19()))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["9.macros".to_string()]);
}

#[test]
fn list_ignores_foreign_files() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(2, "[DEFAULT]\nname = Two\n");
    config.write_profile(10, "[DEFAULT]\nname = Ten\n");
    let dir = config.store.device_dir(&g19());
    fs::write(dir.join("notes.txt"), "hi").unwrap();
    fs::write(dir.join("abc.macros"), "").unwrap();

    assert_eq!(config.store.list(&g19()).unwrap(), vec![2, 10]);
    let names: Vec<String> = config
        .store
        .load_all(&g19())
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Two", "Ten"]);
}

#[test]
fn corrupt_file_reports_line() {
    init_test_logging();
    let config = TestConfig::new();
    config.write_profile(5, "[DEFAULT]\nname = Broken\nthis line has no separator\n");

    let err = config.store.load(&g19(), 5).unwrap_err();
    match err {
        GkError::CorruptProfileStore { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn deleted_profile_is_not_found() {
    init_test_logging();
    let config = TestConfig::new();
    let mut profile = Profile::with_id(g19(), 12, "Short-lived");
    config.store.save(&mut profile).unwrap();

    config.store.delete(&g19(), 12).unwrap();
    assert!(matches!(
        config.store.load(&g19(), 12),
        Err(GkError::ProfileNotFound { id: 12, .. })
    ));
    assert!(matches!(
        config.store.delete(&g19(), 12),
        Err(GkError::ProfileNotFound { .. })
    ));
}

#[test]
fn export_then_import_elsewhere_keeps_id() {
    init_test_logging();
    let source = TestConfig::new();
    let icon = source.path().join("icon.png");
    fs::write(&icon, b"not really a png").unwrap();

    let mut profile = Profile::with_id(g19(), 42, "Shared");
    profile.icon = icon.to_string_lossy().into_owned();
    profile
        .create_macro(Bank::M2, vec![Key::G7], "Hi", MacroAction::Simple("hi".into()))
        .unwrap();
    source.store.save(&mut profile).unwrap();

    let archive = source.path().join("shared.zip");
    source.store.export(&g19(), 42, &archive).unwrap();

    let target = TestConfig::new();
    let imported = target.store.import(&g19(), &archive).unwrap();
    assert_eq!(imported.id, Some(42));
    assert_eq!(imported.name, "Shared");
    assert_eq!(imported.macros(Bank::M2), profile.macros(Bank::M2));

    let resource_dir = target.store.device_dir(&g19()).join("42.resources");
    assert_eq!(imported.icon, resource_dir.join("icon.png").to_string_lossy());
    assert_eq!(fs::read(resource_dir.join("icon.png")).unwrap(), b"not really a png");
}

#[test]
fn import_over_existing_id_picks_fresh_id() {
    init_test_logging();
    let config = TestConfig::new();
    let mut profile = Profile::with_id(g19(), 42, "Original");
    config.store.save(&mut profile).unwrap();

    let archive = config.path().join("original.zip");
    config.store.export(&g19(), 42, &archive).unwrap();
    let imported = config.store.import(&g19(), &archive).unwrap();

    let id = imported.id.unwrap();
    assert_ne!(id, 42);
    assert_eq!(config.store.list(&g19()).unwrap(), vec![42, id]);
    assert_eq!(config.store.load(&g19(), id).unwrap().name, "Original");
}
