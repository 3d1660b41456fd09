//! Robot-mode end-to-end tests.

use std::fs;

use serde_json::{Value, json};

use crate::common::cli::CliRunner;
use crate::common::fixtures::REPLAY_SCRIPT;
use crate::common::init_test_logging;

/// Id from a `profile_saved` document.
fn saved_id(json: &Value) -> u64 {
    json.get("id")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| panic!("no id in {json}"))
}

#[test]
fn robot_quick_start_outputs_json() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["--robot"]);
    result.assert_success();

    let json = result.json();
    assert_eq!(json["tool"], "gkm");
    assert!(json["profiles"].is_array());
    assert!(json["output_modes"].is_array());
}

#[test]
fn robot_profiles_empty_store() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["profiles"])
        .assert_success()
        .assert_json_array_len("", 0);
}

#[test]
fn robot_format_flag_outputs_json() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["version", "--format=json"]);
    result.assert_success();
    assert!(result.json().get("version").is_some());

    let compact = cli.run(&["version", "--format=json-compact"]);
    compact.assert_success();
    assert_eq!(compact.stdout.trim().lines().count(), 1);
}

#[test]
fn robot_macro_lifecycle_with_inheritance() {
    init_test_logging();
    let cli = CliRunner::new();

    cli.run_robot(&["activate", "0"])
        .assert_success()
        .assert_json_field("/active_profile", &json!(0))
        .assert_json_field("/locked", &json!(false));

    let added = cli.run_robot(&[
        "add-macro", "g1", "--name", "Hello", "--type", "simple", "--payload", "hello",
    ]);
    added
        .assert_success()
        .assert_json_field("/bank", &json!(1))
        .assert_json_field("/macro/keys", &json!(["g1"]))
        .assert_json_field("/macro/action", &json!({"type": "simple", "payload": "hello"}));

    let created = cli.run_robot(&["create", "Games", "--base", "0"]);
    created.assert_success().assert_json_field("/action", &json!("created"));
    let games = saved_id(&created.json()).to_string();

    let resolved = cli.run_robot(&["resolve", "g1", "--profile", &games]);
    resolved
        .assert_success()
        .assert_json_field("/found", &json!(true))
        .assert_json_field("/resolved/inherited", &json!(true))
        .assert_json_field("/resolved/profile_id", &json!(0));

    cli.run_robot(&["resolve", "g1_g2", "--profile", &games])
        .assert_success()
        .assert_json_field("/found", &json!(false))
        .assert_json_field("/resolved", &Value::Null);

    let shown = cli.run_robot(&["show", &games, "--effective", "--bank", "1"]);
    shown
        .assert_success()
        .assert_json_field("/name", &json!("Games"))
        .assert_json_field("/base_profile", &json!(0))
        .assert_json_array_len("/banks", 1)
        .assert_json_array_len("/banks/0/macros", 1);

    cli.run_robot(&["show", &games])
        .assert_success()
        .assert_json_array_len("/banks", 3)
        .assert_json_array_len("/banks/0/macros", 0);

    cli.run_robot(&["remove-macro", "g1"])
        .assert_success()
        .assert_json_field("/removed/name", &json!("Hello"));
    cli.run_robot(&["resolve", "g1", "--profile", &games])
        .assert_success()
        .assert_json_field("/found", &json!(false));
}

#[test]
fn robot_profiles_marks_active() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["activate", "0"]).assert_success();
    let created = cli.run_robot(&["create", "Second"]);
    created.assert_success();
    let id = saved_id(&created.json());

    let list = cli.run_robot(&["profiles"]);
    list.assert_success().assert_json_array_len("", 2);
    let json = list.json();
    let rows = json.as_array().unwrap();
    assert_eq!(rows[0]["id"], 0);
    assert_eq!(rows[0]["active"], true);
    assert_eq!(rows[1]["id"], id);
    assert_eq!(rows[1]["active"], false);
}

#[test]
fn robot_duplicate_binding_is_reported() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["add-macro", "g2_g1", "--payload", "x"])
        .assert_success();

    let result = cli.run_robot(&["add-macro", "g1_g2", "--payload", "y"]);
    result.assert_failure();
    let error = result.error_json();
    assert_eq!(error["error"], true);
    assert_eq!(error["recoverable"], true);
    assert!(
        error["suggestion"]
            .as_str()
            .is_some_and(|s| s.contains("remove-macro"))
    );
}

#[test]
fn robot_missing_profile_error() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run_robot(&["show", "999"]);
    result.assert_failure();

    let error = result.error_json();
    assert_eq!(error["error"], true);
    assert!(error["message"].as_str().unwrap().contains("999"));
    assert_eq!(error["suggestion"], "Run: gkm profiles");
}

#[test]
fn robot_lock_prevents_switching() {
    init_test_logging();
    let cli = CliRunner::new();
    let created = cli.run_robot(&["create", "Other"]);
    created.assert_success();
    let id = saved_id(&created.json()).to_string();

    cli.run_robot(&["lock"])
        .assert_success()
        .assert_json_field("/locked", &json!(true));
    cli.run_robot(&["activate", &id])
        .assert_success()
        .assert_json_field("/ok", &json!(false))
        .assert_json_field("/locked", &json!(true));

    cli.run_robot(&["lock", "--off"]).assert_success();
    cli.run_robot(&["activate", &id])
        .assert_success()
        .assert_json_field("/ok", &json!(true));
    assert!(cli.config_dir().join("settings.toml").is_file());
}

#[test]
fn robot_decode_packets() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["decode", "gm", "02050040"])
        .assert_success()
        .assert_json_field("/scope", &json!("macro_memory"))
        .assert_json_field("/keys", &json!(["g1", "g3"]));

    cli.run_robot(&["decode", "nav", "8880"])
        .assert_success()
        .assert_json_field("/scope", &json!("navigation"))
        .assert_json_field("/keys", &json!(["ok", "up"]));

    cli.run_robot(&["decode", "mm", "0301"])
        .assert_success()
        .assert_json_field("/scope", &json!("win_key"));

    let bad = cli.run_robot(&["decode", "gm", "0201"]);
    bad.assert_failure();
    assert!(bad.error_json()["message"].as_str().unwrap().contains("Malformed"));
}

#[test]
fn robot_replay_streams_events() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&[
        "add-macro", "g1", "--bank", "2", "--name", "Two", "--type", "simple", "--payload", "2",
    ])
    .assert_success();

    let script = cli.config_dir().join("script.txt");
    fs::write(&script, REPLAY_SCRIPT).unwrap();
    let result = cli.run_robot(&["replay", script.to_str().unwrap()]);
    result.assert_success();

    let lines = result.json_lines();
    let events: Vec<&str> = lines
        .iter()
        .filter_map(|l| l.get("event").and_then(Value::as_str))
        .collect();
    assert_eq!(events, vec!["bank_changed", "activated", "deactivated"]);

    let summary = &lines.last().unwrap()["summary"];
    assert_eq!(summary["packets"], 7);
    assert_eq!(summary["discarded"], 1);
    assert_eq!(summary["dispatched"], 6);
    assert_eq!(summary["activations"], 1);
    assert_eq!(summary["final_bank"], 2);
}

#[test]
fn robot_replay_reads_stdin() {
    init_test_logging();
    let cli = CliRunner::new().with_stdin("gm 02001040\ngm 02000040\n");
    let result = cli.run(&["--format=json-compact", "replay", "-"]);
    result.assert_success();

    let lines = result.json_lines();
    let summary = &lines.last().unwrap()["summary"];
    assert_eq!(summary["packets"], 2);
    assert_eq!(summary["final_bank"], 1);
}

#[test]
fn robot_export_import_between_configs() {
    init_test_logging();
    let source = CliRunner::new();
    source
        .run_robot(&["add-macro", "g3", "--name", "Three", "--payload", "3"])
        .assert_success();
    let archive = source.config_dir().join("default.zip");
    source
        .run_robot(&["export", "0", archive.to_str().unwrap()])
        .assert_success()
        .assert_json_field("/ok", &json!(true));

    let target = CliRunner::new();
    target
        .run_robot(&["import", archive.to_str().unwrap()])
        .assert_success()
        .assert_json_field("/action", &json!("imported"))
        .assert_json_field("/id", &json!(0));
    target
        .run_robot(&["resolve", "g3"])
        .assert_success()
        .assert_json_field("/resolved/definition/name", &json!("Three"));
}

#[test]
fn robot_device_flag_separates_profiles() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["--device", "left", "create", "Left only"])
        .assert_success();

    cli.run_robot(&["--device", "left", "profiles"])
        .assert_success()
        .assert_json_array_len("", 1);
    cli.run_robot(&["--device", "right", "profiles"])
        .assert_success()
        .assert_json_array_len("", 0);
}
