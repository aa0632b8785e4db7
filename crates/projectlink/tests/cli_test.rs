//! Integration tests for the `projectlink` CLI binary.
//!
//! Argument parsing, config commands, and exit codes run without a box;
//! the rest talk to a wiremock stand-in passed with `--origin`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the binary with config and state under `home`.
fn projectlink_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("projectlink");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RUST_LOG")
        .env_remove("PROJECTLINK_PROFILE")
        .env_remove("PROJECTLINK_ORIGIN")
        .env_remove("PROJECTLINK_SESSION")
        .env_remove("PROJECTLINK_INSECURE")
        .env_remove("PROJECTLINK_TIMEOUT")
        .env_remove("PROJECTLINK_OUTPUT");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = projectlink_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    projectlink_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("discover")
            .and(predicate::str::contains("services"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    projectlink_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("projectlink"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    projectlink_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_watch_requires_a_getter() {
    let home = TempDir::new().unwrap();
    projectlink_cmd(&home).arg("watch").assert().code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_points_under_home() {
    let home = TempDir::new().unwrap();
    projectlink_cmd(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml").and(predicate::str::contains("state.json")));
}

#[test]
fn test_config_show_redacts_sessions() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("config").join("projectlink");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        r#"
default_profile = "home"

[profiles.home]
local_origin = "http://192.168.1.20:3000"
session = "very-secret"
"#,
    )
    .unwrap();

    projectlink_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("192.168.1.20")
                .and(predicate::str::contains("very-secret").not()),
        );
}

#[test]
fn test_unknown_profile_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    let output = projectlink_cmd(&home)
        .args(["--profile", "attic", "config", "show"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("attic"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_invalid_origin_is_rejected() {
    let home = TempDir::new().unwrap();
    let output = projectlink_cmd(&home)
        .args(["--origin", "not a url", "ping"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("origin"));
}

#[test]
fn test_set_rejects_invalid_json_before_connecting() {
    let home = TempDir::new().unwrap();
    projectlink_cmd(&home)
        .args(["--origin", "http://127.0.0.1:9", "set", "setter:x", "OnOff", "{not json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("JSON"));
}

// ── Against a mock box ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_reports_online() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = projectlink_cmd(&home)
        .args(["--origin", &server.uri(), "-o", "json", "ping"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["online"], true);
    assert_eq!(view["local"], true);
    assert_eq!(view["remote"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_offline_exits_with_connection_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = projectlink_cmd(&home)
        .args(["--origin", &server.uri(), "ping"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_prints_channel_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "getter:light-1": { "OnOff": "On" }
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    projectlink_cmd(&home)
        .args([
            "--origin",
            &server.uri(),
            "--session",
            "token-1",
            "get",
            "getter:light-1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"OnOff":"On"}"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_without_session_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = projectlink_cmd(&home)
        .args(["--origin", &server.uri(), "--timeout", "1", "get", "getter:light-1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(8), "{}", combined_output(&output));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/ping"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_services_lists_reported_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "light-1",
                "adapter": "philips_hue@link.mozilla.org",
                "properties": { "name": "Kitchen" },
                "getters": {},
                "setters": {},
                "tags": ["kitchen"]
            }
        ])))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = projectlink_cmd(&home)
        .args(["--origin", &server.uri(), "--session", "t", "-o", "json", "services"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(list[0]["id"], "light-1");
    assert_eq!(list[0]["kind"], "light");
    assert_eq!(list[0]["tags"], serde_json::json!(["kitchen"]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_state_file_never_holds_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let dir = home.path().join("config").join("projectlink");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        format!(
            r#"
default_profile = "home"

[profiles.home]
local_origin = "{}"
skip_discovery = true
"#,
            server.uri()
        ),
    )
    .unwrap();

    let output = projectlink_cmd(&home)
        .args(["--session", "very-secret", "ping"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let paths = projectlink_cmd(&home)
        .args(["-o", "json", "config", "path"])
        .output()
        .unwrap();
    let paths: serde_json::Value = serde_json::from_slice(&paths.stdout).unwrap();
    let text = std::fs::read_to_string(paths["state"].as_str().unwrap()).unwrap();
    assert!(!text.contains("very-secret"), "session leaked into state:\n{text}");

    let state: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(state["session"].is_null());
    assert!(state["local_origin"].as_str().unwrap().starts_with(&server.uri()));
}
