//! `config switch` while the swarm runs is refused; profile listing marks
//! the active one.

mod common;

use assert_cmd::Command;
use std::fs;

#[test]
fn switch_refused_while_lock_held_by_live_owner() {
    let dir = tempfile::tempdir().unwrap();
    common::scaffold_project(dir.path());
    fs::write(
        dir.path().join("profiles/futures-b.json"),
        common::FUTURES_PROFILE.replace("futures-prop", "futures-b"),
    )
    .unwrap();
    // Live lock: assert_cmd runs qsf as a child, so use OUR pid (alive for
    // the duration of the assertion).
    fs::write(
        dir.path().join("supervisor.lock"),
        format!(
            r#"{{"pid": {}, "started_at": "2026-02-01T10:00:00Z", "session_name": "qsf"}}"#,
            std::process::id()
        ),
    )
    .unwrap();

    Command::cargo_bin("qsf")
        .unwrap()
        .args(["config", "switch", "futures-b", "--no-color", "--config"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("while the swarm is running"));
}

#[test]
fn switch_succeeds_when_stopped_and_profiles_lists_active() {
    let dir = tempfile::tempdir().unwrap();
    common::scaffold_project(dir.path());
    fs::write(
        dir.path().join("profiles/futures-b.json"),
        common::FUTURES_PROFILE.replace("futures-prop", "futures-b"),
    )
    .unwrap();

    Command::cargo_bin("qsf")
        .unwrap()
        .args(["config", "switch", "futures-b", "--no-color", "--config"])
        .arg(dir.path())
        .assert()
        .success();

    Command::cargo_bin("qsf")
        .unwrap()
        .args(["config", "profiles", "--no-color", "--config"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("futures-b"))
        .stdout(predicates::str::contains("ACTIVE"));
}

#[test]
fn unknown_profile_fails() {
    let dir = tempfile::tempdir().unwrap();
    common::scaffold_project(dir.path());

    Command::cargo_bin("qsf")
        .unwrap()
        .args(["config", "switch", "nope", "--no-color", "--config"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1);
}
