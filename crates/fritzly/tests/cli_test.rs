//! Integration tests for the `fritzly` CLI binary.
//!
//! Argument parsing, config handling and exit codes run without a gateway;
//! the device commands run against a wiremock FRITZ!Box.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const SID: &str = "ff88e4d39354992f";
const CHALLENGE: &str = "deadbeef";
const RESPONSE: &str = "deadbeef-84e19b8ce02e7d6dc358f4c764ca9d18";
const PLUG: &str = "08761 0000434";

const DEVICELIST: &str = r#"<devicelist version="1">
    <device identifier="08761 0000434" id="17" functionbitmask="2944" fwversion="03.33" manufacturer="AVM" productname="FRITZ!DECT 200">
        <present>1</present>
        <name>Living room plug</name>
        <switch><state>0</state><mode>manuell</mode><lock>0</lock><devicelock>0</devicelock></switch>
        <powermeter><power>4500</power><energy>707</energy></powermeter>
        <temperature><celsius>285</celsius><offset>0</offset></temperature>
    </device>
    <device identifier="11960 0089208" id="18" functionbitmask="320" fwversion="03.54" manufacturer="AVM" productname="Comet DECT">
        <present>1</present>
        <name>Office radiator</name>
        <temperature><celsius>210</celsius><offset>0</offset></temperature>
        <hkr><tist>42</tist><tsoll>40</tsoll><absenk>32</absenk><komfort>44</komfort><lock>0</lock><devicelock>0</devicelock><errorcode>0</errorcode><batterylow>0</batterylow></hkr>
    </device>
</devicelist>"#;

/// Build a [`Command`] for the `fritzly` binary with env isolation.
///
/// Clears all `FRITZLY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn fritzly_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fritzly");
    cmd.env("HOME", "/tmp/fritzly-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fritzly-cli-test-nonexistent")
        .env_remove("FRITZLY_CONFIG")
        .env_remove("FRITZLY_HOST")
        .env_remove("FRITZLY_USERNAME")
        .env_remove("FRITZLY_PASSWORD")
        .env_remove("FRITZLY_SCAN_INTERVAL")
        .env_remove("RUST_LOG");
    cmd
}

/// A command pointed at `server` with the fixture password.
fn gateway_cmd(server: &MockServer, config: &Path) -> assert_cmd::Command {
    let mut cmd = fritzly_cmd();
    cmd.env("FRITZLY_PASSWORD", "secret")
        .arg("--config")
        .arg(config)
        .arg("--host")
        .arg(server.uri())
        .arg("--color")
        .arg("never");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn session_info(sid: &str) -> String {
    format!(
        "<SessionInfo><SID>{sid}</SID><Challenge>{CHALLENGE}</Challenge>\
         <BlockTime>0</BlockTime><Rights></Rights></SessionInfo>"
    )
}

async fn mount_gateway(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .and(query_param_is_missing("response"))
        .and(query_param_is_missing("logout"))
        .respond_with(ResponseTemplate::new(200).set_body_string(session_info("0000000000000000")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .and(query_param("response", RESPONSE))
        .respond_with(ResponseTemplate::new(200).set_body_string(session_info(SID)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .and(query_param("logout", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(session_info("0000000000000000")))
        .mount(server)
        .await;
    switch_cmd("getdevicelistinfos")
        .respond_with(ResponseTemplate::new(200).set_body_string(DEVICELIST))
        .mount(server)
        .await;
}

fn switch_cmd(cmd: &str) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/webservices/homeautoswitch.lua"))
        .and(query_param("switchcmd", cmd))
        .and(query_param("sid", SID))
}

/// Run the binary off the async runtime and collect its output.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fritzly_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    fritzly_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("switch"))
            .and(predicate::str::contains("thermostat"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_unknown_mode_is_rejected_by_parser() {
    fritzly_cmd()
        .args(["thermostat", "mode", PLUG, "manual"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("manual"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("fritzly.toml");
    fritzly_cmd()
        .arg("--config")
        .arg(&file)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fritzly.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    std::fs::write(&file, "host = \"192.168.178.1\"\npassword = \"hunter2\"\n").unwrap();

    fritzly_cmd()
        .arg("--config")
        .arg(&file)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("192.168.178.1")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_zero_scan_interval_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    std::fs::write(&file, "scan_interval = 0\n").unwrap();

    fritzly_cmd()
        .env("FRITZLY_PASSWORD", "secret")
        .arg("--config")
        .arg(&file)
        .arg("devices")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("scan_interval"));
}

#[test]
fn test_out_of_range_setpoint_fails_before_login() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on port 9: a login attempt would exit 7, not 2.
    fritzly_cmd()
        .env("FRITZLY_PASSWORD", "secret")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["--host", "http://127.0.0.1:9"])
        .args(["thermostat", "set", "11960 0089208", "35"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("35"));
}

// ── Gateway commands ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_json_lists_inventory() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = gateway_cmd(&server, &dir.path().join("absent.toml"));
    cmd.args(["devices", "-o", "json"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert!(devices.iter().any(|d| d["ain"] == PLUG && d["kind"] == "switch"));
    assert!(devices.iter().any(|d| d["kind"] == "thermostat"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_plain_filters_by_kind() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = gateway_cmd(&server, &dir.path().join("absent.toml"));
    cmd.args(["devices", "list", "--kind", "thermostat", "-o", "plain"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "11960 0089208");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_switch_on_reports_new_state() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    switch_cmd("setswitchon")
        .and(query_param("ain", PLUG))
        .respond_with(ResponseTemplate::new(200).set_body_string("1\n"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = gateway_cmd(&server, &dir.path().join("absent.toml"));
    cmd.args(["switch", "on", PLUG, "-o", "plain"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "on");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_switch_on_unknown_device_exits_not_found() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = gateway_cmd(&server, &dir.path().join("absent.toml"));
    cmd.args(["switch", "on", "99999 9999999"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_switch_on_thermostat_is_unsupported() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = gateway_cmd(&server, &dir.path().join("absent.toml"));
    cmd.args(["switch", "toggle", "11960 0089208"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_thermostat_mode_off_sends_sentinel() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    switch_cmd("sethkrtsoll")
        .and(query_param("param", "253"))
        .respond_with(ResponseTemplate::new(200).set_body_string("253\n"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = gateway_cmd(&server, &dir.path().join("absent.toml"));
    cmd.args(["thermostat", "mode", "11960 0089208", "off", "-o", "plain"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "off");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_password_exits_auth() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    let dir = tempfile::tempdir().unwrap();

    // Any other response hash gets the unauthenticated SID back.
    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .respond_with(ResponseTemplate::new(200).set_body_string(session_info("0000000000000000")))
        .with_priority(10)
        .mount(&server)
        .await;

    let mut cmd = gateway_cmd(&server, &dir.path().join("absent.toml"));
    cmd.env("FRITZLY_PASSWORD", "wrong").arg("devices");
    let output = run(cmd).await;

    let text = combined_output(&output);
    assert_eq!(output.status.code(), Some(3), "{text}");
    assert!(text.contains("Authentication failed"), "{text}");
}
