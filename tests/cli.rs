//! End-to-end tests driving the real `track` binary in a temp directory.
//!
//! stdout is piped, so the CLI switches to JSON output on its own and the
//! assertions parse structured payloads instead of scraping text.

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;

fn track(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("track").expect("binary builds");
    cmd.current_dir(dir);
    cmd
}

fn stdout_json(dir: &Path, args: &[&str]) -> Value {
    let output = track(dir).args(args).assert().success();
    serde_json::from_slice(&output.get_output().stdout).expect("valid JSON output")
}

fn init_project(dir: &Path) -> String {
    let root = stdout_json(dir, &["init", "Test Project"]);
    root["id"].as_str().expect("root id").to_string()
}

fn new_track(dir: &Path, title: &str, parent: &str) -> String {
    let created = stdout_json(dir, &["new", title, "--parent", parent]);
    created["id"].as_str().expect("track id").to_string()
}

fn get_track<'a>(tracks: &'a Value, id: &str) -> &'a Value {
    tracks["tracks"]
        .as_array()
        .expect("tracks array")
        .iter()
        .find(|t| t["id"] == id)
        .expect("track present in report")
}

#[test]
fn init_creates_database_and_root() {
    let dir = tempfile::tempdir().unwrap();
    let root_id = init_project(dir.path());

    assert_eq!(root_id.len(), 8);
    assert!(dir.path().join(".track/track.db").exists());

    let report = stdout_json(dir.path(), &["status"]);
    let root = get_track(&report, &root_id);
    assert_eq!(root["title"], "Test Project");
    assert_eq!(root["status"], "planned");
    assert_eq!(root["kind"], "super");
    assert!(root["parent_id"].is_null());
}

#[test]
fn init_twice_requires_force() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    let output = track(dir.path()).args(["init"]).assert().failure().code(2);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "ALREADY_INITIALIZED");

    track(dir.path()).args(["init", "Rebuilt", "--force"]).assert().success();
}

#[test]
fn commands_fail_before_init() {
    let dir = tempfile::tempdir().unwrap();
    let output = track(dir.path()).args(["status"]).assert().failure().code(2);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "NOT_INITIALIZED");
}

#[test]
fn block_and_unblock_cascade_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let a = new_track(dir.path(), "A", &root);

    // B blocks A at creation time; A was planned, so it goes blocked.
    let b = stdout_json(dir.path(), &["new", "B", "--parent", &root, "--blocks", &a]);
    let b = b["id"].as_str().unwrap().to_string();

    let report = stdout_json(dir.path(), &["status", "--all"]);
    assert_eq!(get_track(&report, &a)["status"], "blocked");
    assert_eq!(get_track(&report, &a)["blocked_by"][0], b.as_str());

    // Completing B re-plans A and stamps B's completed_at.
    let change = stdout_json(dir.path(), &["update", &b, "--status", "done"]);
    assert_eq!(change["unblocked"][0], a.as_str());

    let report = stdout_json(dir.path(), &["status", "--all"]);
    assert_eq!(get_track(&report, &a)["status"], "planned");
    let b_row = get_track(&report, &b);
    assert_eq!(b_row["status"], "done");
    assert!(b_row["completed_at"].is_i64());
}

#[test]
fn cycle_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let a = new_track(dir.path(), "A", &root);
    let b = new_track(dir.path(), "B", &root);

    track(dir.path())
        .args(["update", &a, "--status", "in_progress", "--blocks", &b])
        .assert()
        .success();

    let output = track(dir.path())
        .args(["update", &b, "--status", "on_hold", "--blocks", &a])
        .assert()
        .failure()
        .code(5);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "CYCLE_DETECTED");
}

#[test]
fn done_parent_supersedes_children() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let feature = new_track(dir.path(), "Feature", &root);
    let task = new_track(dir.path(), "Task", &feature);

    let change = stdout_json(dir.path(), &["update", &feature, "--status", "done"]);
    assert_eq!(change["superseded"][0], task.as_str());

    let report = stdout_json(dir.path(), &["status", "--all"]);
    let task_row = get_track(&report, &task);
    assert_eq!(task_row["status"], "superseded");
    assert_eq!(task_row["next_prompt"], "Parent marked done - task superseded");
    assert!(task_row["completed_at"].is_i64());

    // Reviving the superseded task under a done parent is rejected.
    let output = track(dir.path())
        .args(["update", &task, "--status", "planned"])
        .assert()
        .failure()
        .code(4);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "ANCESTOR_FINAL");
}

#[test]
fn delete_cascades_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let feature = new_track(dir.path(), "Feature", &root);
    let task = new_track(dir.path(), "Task", &feature);
    new_track(dir.path(), "Keeper", &root);

    let deleted = stdout_json(dir.path(), &["delete", &feature, "--force"]);
    assert_eq!(deleted["count"], 2);

    let report = stdout_json(dir.path(), &["status", "--all"]);
    let ids: Vec<&str> = report["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(!ids.contains(&feature.as_str()));
    assert!(!ids.contains(&task.as_str()));
    assert_eq!(ids.len(), 2);
}

#[test]
fn root_cannot_be_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());

    let output = track(dir.path())
        .args(["delete", &root, "--force"])
        .assert()
        .failure()
        .code(5);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "CANNOT_DELETE_ROOT");
}

#[test]
fn sort_reorders_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let a = new_track(dir.path(), "A", &root);
    let b = new_track(dir.path(), "B", &root);
    let c = new_track(dir.path(), "C", &root);

    track(dir.path()).args(["sort", &c, "before", &a]).assert().success();

    let report = stdout_json(dir.path(), &["status"]);
    let children: Vec<&str> = get_track(&report, &root)["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|id| id.as_str().unwrap())
        .collect();
    assert_eq!(children, vec![c.as_str(), a.as_str(), b.as_str()]);
}

#[test]
fn update_unknown_track_is_a_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    let output = track(dir.path())
        .args(["update", "zzzzzzzz", "--status", "done"])
        .assert()
        .failure()
        .code(3);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "TRACK_NOT_FOUND");
}

#[test]
fn archive_gates_on_status() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let a = new_track(dir.path(), "A", &root);

    let output = track(dir.path()).args(["archive", &a]).assert().failure().code(4);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "NOT_ARCHIVABLE");

    track(dir.path()).args(["update", &a, "--status", "done"]).assert().success();
    let archived = stdout_json(dir.path(), &["archive", &a]);
    assert_eq!(archived["archived"], true);

    // Hidden by default, visible with --all.
    let report = stdout_json(dir.path(), &["status"]);
    assert!(!report["tracks"].as_array().unwrap().iter().any(|t| t["id"] == a.as_str()));
    let report = stdout_json(dir.path(), &["status", "--all"]);
    assert!(report["tracks"].as_array().unwrap().iter().any(|t| t["id"] == a.as_str()));

    let restored = stdout_json(dir.path(), &["unarchive", &a]);
    assert_eq!(restored["archived"], false);
}

#[test]
fn resolve_by_title_and_ambiguity() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let a = new_track(dir.path(), "Login flow", &root);

    let shown = stdout_json(dir.path(), &["show", "Login flow"]);
    assert_eq!(shown["id"], a.as_str());

    new_track(dir.path(), "Login flow", &root);
    let output = track(dir.path()).args(["show", "Login flow"]).assert().failure().code(3);
    let err: Value = serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "AMBIGUOUS_TRACK");
}

#[test]
fn scoped_status_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = init_project(dir.path());
    let feature = new_track(dir.path(), "Feature", &root);
    let task = new_track(dir.path(), "Task", &feature);
    let other = new_track(dir.path(), "Other", &root);

    let report = stdout_json(dir.path(), &["status", &feature]);
    let ids: Vec<&str> = report["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&feature.as_str()));
    assert!(ids.contains(&task.as_str()));
    assert!(!ids.contains(&other.as_str()));
    assert!(!ids.contains(&root.as_str()));
}
