//! End-to-end tests for the `zerobyte` binary
//!
//! Each test runs in its own temp directory with config and session
//! locations pointed inside it, so nothing from the host leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const VALID_CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

fn zerobyte(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("zerobyte").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("ZEROBYTE_SESSION", home.join("session.json"))
        .env_remove("ZEROBYTE_CONFIG")
        .env_remove("ZEROBYTE_IPFS_ADDR")
        .env_remove("ZEROBYTE_IPFS_API")
        .env_remove("VIRUSTOTAL_API_KEY")
        .env_remove("FIREBASE_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_download_rejects_invalid_cid() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["download", "not-a-cid"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid IPFS hash"));
}

#[test]
fn test_download_requires_session() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["download", VALID_CID])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Not signed in"));

    assert!(!home.path().join(VALID_CID).exists());
}

#[test]
fn test_download_refuses_to_overwrite() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("existing.bin"), b"keep me").unwrap();

    zerobyte(home.path())
        .args(["download", VALID_CID, "--output", "existing.bin"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(std::fs::read(home.path().join("existing.bin")).unwrap(), b"keep me");
}

#[test]
fn test_upload_requires_session() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("report.pdf"), b"%PDF-1.4").unwrap();

    zerobyte(home.path())
        .args(["upload", "report.pdf"])
        .assert()
        .code(6);
}

#[test]
fn test_upload_missing_file() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["upload", "missing.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing.txt"));
}

#[test]
fn test_json_error_report() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["--format", "json", "download", "Qm123"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"success\":false"))
        .stdout(predicate::str::contains("E6002"));
}

#[test]
fn test_status_offline_node() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["status", "--port", "9"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Offline"));
}

#[test]
fn test_invalid_node_address() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["status", "--node", "/ip4/300.1.1.1/tcp/5001"])
        .assert()
        .code(2);
}

#[test]
fn test_logout_without_session() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_whoami_without_session() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path()).arg("whoami").assert().code(6);
}

#[test]
fn test_login_without_credentials() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .env_remove("ZEROBYTE_EMAIL")
        .env_remove("ZEROBYTE_PASSWORD")
        .arg("login")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Please enter email and password"));
}

#[test]
fn test_login_with_empty_credentials() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .env_remove("ZEROBYTE_EMAIL")
        .env_remove("ZEROBYTE_PASSWORD")
        .args(["login", "--email", "  ", "--password", ""])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Please enter email and password"));

    assert!(!home.path().join("session.json").exists());
}

#[test]
fn test_config_init_show_path() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("zerobyte.toml");
    let config_arg = config.to_str().unwrap();

    zerobyte(home.path())
        .args(["config", "init", "--config", config_arg])
        .assert()
        .success();
    assert!(config.is_file());

    zerobyte(home.path())
        .args(["config", "init", "--config", config_arg])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    zerobyte(home.path())
        .args(["config", "show", "--config", config_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ipfs]"))
        .stdout(predicate::str::contains("/ip4/127.0.0.1/tcp/5001"));

    zerobyte(home.path())
        .args(["config", "path", "--config", config_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("zerobyte.toml"));
}

#[test]
fn test_config_path_not_created() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(not created)"));
}

#[test]
fn test_missing_explicit_config() {
    let home = TempDir::new().unwrap();
    zerobyte(home.path())
        .args(["status", "--config", "nope.toml"])
        .assert()
        .code(3);
}
