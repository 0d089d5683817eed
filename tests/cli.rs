use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;

fn pvenotes() -> assert_cmd::Command {
    cargo_bin_cmd!("pvenotes").into()
}

fn write_config(dir: &tempfile::TempDir, proxmox: &str) -> std::path::PathBuf {
    let config_path = dir.path().join("pvenotes.toml");
    let mut f = std::fs::File::create(&config_path).unwrap();
    write!(
        f,
        r#"
[proxmox]
{proxmox}

[notes]
directory = "notes"

[logging]
file = "sync.log"
"#
    )
    .unwrap();
    config_path
}

#[test]
fn help_works() {
    pvenotes()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror Proxmox VE inventory notes"));
}

#[test]
fn sync_help_mentions_kind() {
    pvenotes()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--kind"));
}

#[test]
fn missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("absent.toml");

    pvenotes()
        .args(["--config", config_path.to_str().unwrap(), "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn validation_rejects_malformed_token() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(
        &dir,
        r#"base_url = "https://pve.example:8006"
api_token = "not-a-token""#,
    );

    pvenotes()
        .args(["--config", config_path.to_str().unwrap(), "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_token"));
}

#[test]
fn validation_rejects_missing_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(
        &dir,
        r#"base_url = "pve.example:8006"
api_token = "root@pam!sync=abc""#,
    );

    pvenotes()
        .args(["--config", config_path.to_str().unwrap(), "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn unknown_kind_is_a_usage_error() {
    pvenotes()
        .args(["sync", "--kind", "storage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("storage"));
}

#[test]
fn unreachable_cluster_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(
        &dir,
        r#"base_url = "http://127.0.0.1:9"
api_token = "root@pam!sync=abc"
timeout_s = 2"#,
    );

    pvenotes()
        .args(["--config", config_path.to_str().unwrap(), "sync", "--kind", "vm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot reach Proxmox API"));

    assert!(!dir.path().join("notes").join("VMs").exists());
}

#[test]
fn init_creates_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pvenotes.toml");

    pvenotes()
        .args(["--config", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[proxmox]"));
    assert!(content.contains("api_token"));
}

#[test]
fn init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pvenotes.toml");
    std::fs::write(&config_path, "# mine\n").unwrap();

    pvenotes()
        .args(["--config", config_path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "# mine\n");

    pvenotes()
        .args(["--config", config_path.to_str().unwrap(), "init", "--force"])
        .assert()
        .success();
    assert!(std::fs::read_to_string(&config_path).unwrap().contains("[proxmox]"));
}
