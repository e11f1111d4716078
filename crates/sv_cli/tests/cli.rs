//! Black-box tests for the `svotes` binary against the agora fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/agora").join(name)
}

/// A clean command: no ambient database or log overrides from the caller.
fn svotes() -> Command {
    let mut cmd = Command::cargo_bin("svotes").unwrap();
    cmd.env_remove("SVOTES_DB").env_remove("SVOTES_BUSY_TIMEOUT_MS").env_remove("RUST_LOG");
    cmd
}

fn imported() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("votes.db");
    svotes().arg("--db").arg(&db).arg("import").arg(fixture("dataset.json")).assert().success();
    (dir, db)
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn report(db: &Path, event: i64) -> Value {
    stdout_json(svotes().arg("--db").arg(db).args(["report", "--event", &event.to_string()]))
}

fn votes_of(lines: &Value) -> Vec<u64> {
    lines.as_array().unwrap().iter().map(|l| l["votes"].as_u64().unwrap()).collect()
}

#[test]
fn init_creates_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("fresh.db");
    svotes()
        .arg("--db")
        .arg(&db)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("fresh.db"));
    assert!(db.exists());
    // Second run is a no-op.
    svotes().arg("--db").arg(&db).arg("init").assert().success();
}

#[test]
fn import_then_report() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("votes.db");
    let summary = stdout_json(svotes().arg("--db").arg(&db).arg("import").arg(fixture("dataset.json")));
    assert_eq!(summary["summary"]["events"], 2);
    assert_eq!(summary["summary"]["bodies"], 3);
    assert_eq!(summary["dataset_sha256"].as_str().unwrap().len(), 64);

    let r = report(&db, 1);
    assert_eq!(r["cover"]["event_type"], "agora");
    assert_eq!(r["cover"]["weighted"], true);

    let nord = &r["bodies"][0];
    assert_eq!(nord["body_id"], 10);
    assert_eq!(nord["member_count"], 60);
    assert_eq!(nord["antenna_votes"], 3);
    assert_eq!(votes_of(&nord["off_event"]), vec![1, 1, 1]);
    assert_eq!(votes_of(&nord["on_event"]), vec![3]);

    let sud = &r["bodies"][1];
    assert_eq!(sud["antenna_votes"], 2);
    assert_eq!(votes_of(&sud["off_event"]), vec![2]);
    assert!(sud["on_event"].as_array().unwrap().is_empty());

    let partner = &r["bodies"][2];
    assert_eq!(partner["antenna_votes"], 0);
    assert_eq!(partner["member_count"], Value::Null);

    assert_eq!(r["totals"]["antenna_votes"], 5);
    assert_eq!(r["totals"]["off_event_delegates"], 4);
    assert_eq!(r["totals"]["on_event_votes"], 3);
    assert_eq!(r["consistency"]["pass"], true);
}

#[test]
fn non_assembly_event_weighs_nothing() {
    let (_dir, db) = imported();
    let r = report(&db, 2);
    assert_eq!(r["cover"]["weighted"], false);
    assert_eq!(r["bodies"][0]["antenna_votes"], 0);
    assert_eq!(votes_of(&r["bodies"][0]["off_event"]), vec![0]);
}

#[test]
fn upload_members_reweights_the_antenna() {
    let (_dir, db) = imported();
    let out = stdout_json(
        svotes()
            .arg("--db")
            .arg(&db)
            .args(["upload-members", "--event", "1", "--body", "10", "--file"])
            .arg(fixture("members_nord_101.json")),
    );
    assert_eq!(out["member_count"], 101);
    assert_eq!(out["votes"], 4);
    assert_eq!(votes_of(&out["delegates"]["off_event"]), vec![2, 1, 1]);
    assert_eq!(votes_of(&out["delegates"]["on_event"]), vec![4]);
}

#[test]
fn update_application_moves_on_event_votes() {
    let (_dir, db) = imported();
    let out = stdout_json(svotes().arg("--db").arg(&db).args([
        "update-application",
        "--id",
        "2",
        "--patch",
        r#"{"registered":true}"#,
    ]));
    assert_eq!(out["application"]["registered"], true);
    let r = report(&db, 1);
    assert_eq!(votes_of(&r["bodies"][0]["on_event"]), vec![2, 1]);
    assert_eq!(votes_of(&r["bodies"][0]["off_event"]), vec![1, 1, 1]);
}

#[test]
fn set_event_type_recomputes_the_event() {
    let (_dir, db) = imported();
    svotes().arg("--db").arg(&db).args(["set-event-type", "--event", "1", "--type", "spm"]).assert().success();
    let r = report(&db, 1);
    assert_eq!(r["cover"]["event_type"], "spm");
    assert_eq!(r["totals"]["antenna_votes"], 0);
    assert_eq!(r["consistency"]["pass"], true);
}

#[test]
fn unknown_event_exits_3() {
    let (_dir, db) = imported();
    svotes()
        .arg("--db")
        .arg(&db)
        .args(["report", "--event", "9"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("event 9 not found"));
    svotes().arg("--db").arg(&db).args(["recalculate", "--event", "1", "--body", "99"]).assert().code(3);
}

#[test]
fn rejected_patches_exit_2_and_change_nothing() {
    let (_dir, db) = imported();
    let before = report(&db, 1);
    for patch in [r#"{"participant_order":0}"#, r#"{"colour":"red"}"#, "not json"] {
        svotes()
            .arg("--db")
            .arg(&db)
            .args(["update-application", "--id", "2", "--patch", patch])
            .assert()
            .code(2);
    }
    assert_eq!(report(&db, 1), before);
}

#[test]
fn invalid_dataset_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"events":[{"id":1,"name":"X","type":"congress"}],"bodies":[]}"#).unwrap();
    svotes()
        .arg("--db")
        .arg(dir.path().join("votes.db"))
        .arg("import")
        .arg(&bad)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("/events/0/type"));
}

#[test]
fn report_out_writes_a_file() {
    let (dir, db) = imported();
    let out = dir.path().join("report.json");
    svotes()
        .arg("--db")
        .arg(&db)
        .args(["report", "--event", "1", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    let written: Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(written, report(&db, 1));
}

#[test]
fn config_file_and_env_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("svotes.json");

    fs::write(&cfg, r#"{"database_path":"https://example.org/votes.db"}"#).unwrap();
    svotes().arg("--config").arg(&cfg).arg("init").assert().code(2);

    fs::write(&cfg, r#"{"database_path":"from_config.db","journal_mode":"delete"}"#).unwrap();
    svotes().arg("--config").arg(&cfg).arg("init").assert().success();
    assert!(dir.path().join("from_config.db").exists());

    let env_db = dir.path().join("from_env.db");
    svotes().env("SVOTES_DB", &env_db).arg("--config").arg(&cfg).arg("init").assert().success();
    assert!(env_db.exists());
}

#[test]
fn missing_input_file_exits_4() {
    let (dir, db) = imported();
    svotes()
        .arg("--db")
        .arg(&db)
        .args(["upload-members", "--event", "1", "--body", "10", "--file"])
        .arg(dir.path().join("absent.json"))
        .assert()
        .code(4);
}
