//! End-to-end transfer tests
//!
//! These tests copy real files through a real SSH server.
//!
//! **These tests are ignored by default** because they require:
//! - an SSH server reachable at `RSCP_E2E_HOST` (default `127.0.0.1:22`)
//! - a key in the running ssh-agent that the server accepts for `$USER`
//! - `/usr/bin/scp` on the server
//!
//! Run with: `cargo test --test e2e_test -- --ignored`

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

struct TestHost {
    #[allow(dead_code)] // Keeps temp dir alive
    dir: tempfile::TempDir,
    config: std::path::PathBuf,
}

impl TestHost {
    fn new() -> Self {
        let target = std::env::var("RSCP_E2E_HOST").unwrap_or_else(|_| "127.0.0.1:22".into());
        let (host, port) = target.rsplit_once(':').unwrap_or((target.as_str(), "22"));

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = dir.path().join("config.toml");
        let content = format!(
            r#"
[connection]
host = "{}"
port = {}
use_agent = true
connect_timeout = 10

[transfer]
timeout = 60
"#,
            host, port
        );
        std::fs::write(&config, content).expect("Failed to write config");

        Self { dir, config }
    }

    fn rscp(&self) -> Command {
        let mut cmd = Command::cargo_bin("rscp").expect("Failed to locate rscp binary");
        cmd.arg("--config").arg(&self.config);
        cmd
    }
}

fn write_fixture(dir: &Path, name: &str, len: usize) -> Vec<u8> {
    let content: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(dir.join(name), &content).expect("Failed to write fixture");
    content
}

fn round_trip(host: &TestHost, extra: &[&str]) {
    let local = tempfile::tempdir().unwrap();
    let name = format!("rscp-e2e-{}.bin", std::process::id());
    let content = write_fixture(local.path(), &name, 200_000);

    host.rscp()
        .arg("put")
        .arg(local.path().join(&name))
        .args(extra)
        .assert()
        .success();

    let back = tempfile::tempdir().unwrap();
    host.rscp()
        .args(["get", name.as_str()])
        .arg(back.path())
        .args(["--output", "copy.bin"])
        .args(extra)
        .assert()
        .success();

    let copy = std::fs::read(back.path().join("copy.bin")).unwrap();
    assert_eq!(copy, content);

    host.rscp()
        .args(["exec", "rm", "-f", name.as_str()])
        .assert()
        .success();
}

#[test]
#[ignore]
fn test_round_trip_checked() {
    round_trip(&TestHost::new(), &["--checked"]);
}

#[test]
#[ignore]
fn test_stream_download_appends_status_byte() {
    let host = TestHost::new();
    let local = tempfile::tempdir().unwrap();
    let name = format!("rscp-e2e-stream-{}.txt", std::process::id());
    std::fs::write(local.path().join(&name), b"hello").unwrap();

    host.rscp()
        .arg("put")
        .arg(local.path().join(&name))
        .arg("--checked")
        .assert()
        .success();

    let back = tempfile::tempdir().unwrap();
    host.rscp()
        .args(["get", name.as_str()])
        .arg(back.path())
        .assert()
        .success();

    let copy = std::fs::read(back.path().join(&name)).unwrap();
    assert_eq!(copy, b"hello\0");

    host.rscp()
        .args(["exec", "rm", "-f", name.as_str()])
        .assert()
        .success();
}

#[test]
#[ignore]
fn test_exec_output() {
    TestHost::new()
        .rscp()
        .args(["exec", "echo", "rscp-e2e"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rscp-e2e"));
}

#[test]
#[ignore]
fn test_missing_remote_file() {
    let local = tempfile::tempdir().unwrap();
    TestHost::new()
        .rscp()
        .args(["get", "rscp-e2e-definitely-missing.bin", "--checked"])
        .arg(local.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file"));
}
