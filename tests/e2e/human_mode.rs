//! Human-mode end-to-end tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::common::init_test_logging;

/// `gkm` with a private config directory and plain output.
fn gkm(config: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gkm").expect("gkm binary is built");
    cmd.env("GKM_CONFIG_DIR", config.path())
        .env("RUST_LOG", "off")
        .env_remove("GKM_FORMAT")
        .env_remove("GKM_DEVICE")
        .arg("--no-color");
    cmd
}

#[test]
fn human_quick_start_lists_commands() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("PROFILES"))
        .stdout(predicate::str::contains("gkm add-macro"))
        .stdout(predicate::str::contains("gkm --help"));
}

#[test]
fn human_empty_profile_list_warns() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .arg("profiles")
        .assert()
        .success()
        .stderr(predicate::str::contains("No profiles found"));
}

#[test]
fn human_create_and_show() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["create", "Games", "--window", "quake", "--author", "me"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile 'Games' created"));

    gkm(&config)
        .args(["add-macro", "g2_g1", "--name", "Dash", "--type", "keyboard"])
        .args(["--payload", "KEY_LEFTSHIFT", "--repeat-mode", "toggle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bound g2_g1 in M1 to 'Dash'"));

    gkm(&config)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Default (0) *active*"))
        .stdout(predicate::str::contains("Dash"))
        .stdout(predicate::str::contains("[toggle]"))
        .stdout(predicate::str::contains("(no macros)"));

    gkm(&config)
        .arg("profiles")
        .assert()
        .success()
        .stdout(predicate::str::contains("Games"))
        .stdout(predicate::str::contains("1 macros"));
}

#[test]
fn human_resolve_reports_missing_binding() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["resolve", "g1", "--bank", "m3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No macro bound to g1 in M3"));
}

#[test]
fn human_decode_lists_keys() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["decode", "mm", "0109"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Multimedia: next play"));

    gkm(&config)
        .args(["decode", "gm", "02000040"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(none)"));
}

#[test]
fn human_error_has_hint() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["activate", "999"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Profile 999 not found"))
        .stderr(predicate::str::contains("Hint: Run: gkm profiles"));
}

#[test]
fn human_unknown_key_is_rejected() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["add-macro", "g1_q7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key name 'q7'"));
}

#[test]
fn human_default_profile_cannot_be_deleted() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["delete", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be deleted"));
}

#[test]
fn human_output_has_no_escape_codes_with_no_color() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["add-macro", "g1", "--payload", "x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn human_completions_generate() {
    init_test_logging();
    let config = TempDir::new().unwrap();
    gkm(&config)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gkm"));
}
