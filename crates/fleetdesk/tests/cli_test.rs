//! Integration tests for the `fleetdesk` CLI binary.
//!
//! Argument parsing and config handling run without a backend; request
//! commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fleetdesk` binary with env isolation.
fn fleetdesk_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fleetdesk");
    cmd.env("HOME", "/tmp/fleetdesk-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fleetdesk-cli-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("FLEETDESK_CONFIG")
        .env_remove("FLEETDESK_BACKEND")
        .env_remove("FLEETDESK_OUTPUT")
        .env_remove("FLEETDESK_INSECURE")
        .env_remove("FLEETDESK_TIMEOUT")
        .env_remove("FLEETDESK_TOKEN");
    cmd
}

/// Write a config pointing every backend at `base` with state under `dir`.
fn write_config(dir: &Path, base: &str) -> PathBuf {
    write_config_with(dir, base, "")
}

/// Like [`write_config`], with extra lines appended to `[defaults]`.
fn write_config_with(dir: &Path, base: &str, defaults: &str) -> PathBuf {
    let path = dir.join("config.toml");
    let state = dir.join("state");
    std::fs::write(
        &path,
        format!(
            r#"
[defaults]
timeout = 5
state_dir = "{}"
{defaults}

[management]
base_url = "{base}/api"

[gateway]
base_url = "{base}/gateway"
"#,
            state.display()
        ),
    )
    .unwrap();
    path
}

/// Command with `--config` set and prompts disabled.
fn configured_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = fleetdesk_cmd();
    cmd.arg("--config").arg(config).arg("--yes");
    cmd
}

/// Run the blocking CLI off the async runtime's worker threads.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fleetdesk_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(stderr(&output).contains("Usage") || stdout(&output).contains("Usage"));
}

#[test]
fn test_help_lists_verbs() {
    fleetdesk_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("get")
            .and(predicate::str::contains("download"))
            .and(predicate::str::contains("upload"))
            .and(predicate::str::contains("login")),
    );
}

#[test]
fn test_version_flag() {
    fleetdesk_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetdesk"));
}

#[test]
fn test_completions_zsh() {
    fleetdesk_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_param_syntax() {
    fleetdesk_cmd()
        .args(["get", "device/list", "-P", "novalue"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    fleetdesk_cmd()
        .args(["--config", "/tmp/somewhere/fd.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/somewhere/fd.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    configured_cmd(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    configured_cmd(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    configured_cmd(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("management.base_url")
                .and(predicate::str::contains("http://localhost:8080/api")),
        );
}

#[test]
fn test_config_show_rejects_bad_toml() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[defaults\ntimeout = ").unwrap();

    configured_cmd(&config)
        .args(["config", "show"])
        .assert()
        .failure()
        .code(1);
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_get_gateway_prints_canonical_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway/device/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "Data": [{ "id": 1 }], "Total": 1 }
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let mut cmd = configured_cmd(&config);
    cmd.args(["-b", "gateway", "-o", "json-compact", "get", "device/list"]);

    let output = run(cmd).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value["list"], json!([{ "id": 1 }]));
    assert_eq!(value["total"], json!(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_business_failure_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/role"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 1, "message": "not found" })),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let mut cmd = configured_cmd(&config);
    cmd.args(["post", "role", "-d", r#"{"name":"ops"}"#]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(6));
    assert_eq!(
        stderr(&output).matches("not found").count(),
        1,
        "stderr: {}",
        stderr(&output)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_token_is_sent_and_expiry_clears_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "data": 1 })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut login = configured_cmd(&config);
    login.args(["login", "--token", "abc"]);
    assert!(run(login).await.status.success());

    let mut expired = configured_cmd(&config);
    expired.args(["get", "me"]);
    let output = run(expired).await;
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(
        stderr(&output).matches("session expired").count(),
        1,
        "stderr: {}",
        stderr(&output)
    );
    assert!(stderr(&output).contains("fleetdesk login"));

    let mut after = configured_cmd(&config);
    after.args(["get", "public"]);
    assert!(run(after).await.status.success());

    let requests = server.received_requests().await.unwrap();
    let last = requests.last().unwrap();
    assert!(!last.headers.contains_key("authorization"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fast_redirect_skips_notice_right_after_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config_with(
        dir.path(),
        &server.uri(),
        r#"expiry_policy = "fast-redirect""#,
    );

    let mut login = configured_cmd(&config);
    login.args(["login", "--token", "abc"]);
    assert!(run(login).await.status.success());

    let mut expired = configured_cmd(&config);
    expired.args(["get", "me"]);
    let output = run(expired).await;
    assert_eq!(output.status.code(), Some(3));
    assert!(
        !stderr(&output).contains("session expired"),
        "stderr: {}",
        stderr(&output)
    );
    assert!(stderr(&output).contains("fleetdesk login"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_writes_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/export"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a,b\n1,2\n".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let out = dir.path().join("export.csv");
    let mut cmd = configured_cmd(&config);
    cmd.args(["download", "export", "-m", "post", "-P", "kind=csv", "-O"])
        .arg(&out);

    let output = run(cmd).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read(&out).unwrap(), b"a,b\n1,2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_backend_exit_code() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1");
    let mut cmd = configured_cmd(&config);
    cmd.args(["get", "device/list"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(7));
    assert!(stderr(&output).contains("network error"));
}

#[test]
fn test_assessment_not_configured() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1");

    configured_cmd(&config)
        .args(["-b", "assessment", "get", "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}
