//! Process-level tests for the `mfsync` binary's `init`/`sync` exit codes
//! (spec §6's CLI contract: "Exit code 0 on success; non-zero on any
//! error").

use assert_cmd::Command;

#[test]
fn init_server_creates_repository_layout() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("mfsync")
        .unwrap()
        .current_dir(dir.path())
        .args(["init", "--server"])
        .assert()
        .success();

    assert!(dir.path().join("objects").is_dir());
    assert!(dir.path().join("versions/0").is_file());
}

#[test]
fn init_client_writes_remote_and_last_sync() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("mfsync")
        .unwrap()
        .current_dir(dir.path())
        .args(["init", "example.com:/srv/repo"])
        .assert()
        .success();

    let remote = std::fs::read_to_string(dir.path().join(".mf/remote")).unwrap();
    assert_eq!(remote.trim(), "example.com:/srv/repo");
    let last_sync = std::fs::read_to_string(dir.path().join(".mf/last_sync")).unwrap();
    assert_eq!(last_sync.trim(), "0");
}

#[test]
fn init_without_remote_or_server_flag_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("mfsync")
        .unwrap()
        .current_dir(dir.path())
        .args(["init"])
        .assert()
        .failure();
}

#[test]
fn sync_without_a_working_tree_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("mfsync")
        .unwrap()
        .current_dir(dir.path())
        .args(["sync"])
        .assert()
        .failure();
}
