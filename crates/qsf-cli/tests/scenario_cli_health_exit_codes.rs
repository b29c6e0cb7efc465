//! `health` exits 0 when nothing fails and 2 when a check fails.

mod common;

use assert_cmd::Command;

#[test]
fn healthy_project_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    common::scaffold_project(dir.path());
    // Non-empty sample data keeps the data category green.
    std::fs::write(dir.path().join("data/samples/ES-1m.csv"), "ts,o,h,l,c,v\n").unwrap();

    Command::cargo_bin("qsf")
        .unwrap()
        .args(["health", "--no-color", "--config"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("[PASS]"));
}

#[test]
fn broken_config_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    common::scaffold_project(dir.path());
    std::fs::write(dir.path().join("config.json"), "{not json").unwrap();

    Command::cargo_bin("qsf")
        .unwrap()
        .args(["health", "--category", "project", "--no-color", "--config"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stdout(predicates::str::contains("[FAIL]"));
}

#[test]
fn strategies_json_lists_published_bundles() {
    let dir = tempfile::tempdir().unwrap();
    common::scaffold_project(dir.path());

    // A published bundle directory in good/.
    let bundle = dir.path().join("output/strategies/good/RSI_ES");
    std::fs::create_dir_all(&bundle).unwrap();
    std::fs::write(bundle.join("README.md"), "# RSI_ES\n").unwrap();

    let output = Command::cargo_bin("qsf")
        .unwrap()
        .args(["strategies", "--filter", "good", "--json", "--no-color", "--config"])
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let rows: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(rows[0]["name"], "RSI_ES");
    assert_eq!(rows[0]["category"], "good");
    assert!(rows[0]["path"].as_str().unwrap().ends_with("RSI_ES"));
}
