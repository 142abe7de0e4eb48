//! Basic CLI tests for the apcupsd2mqtt binary.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;

/// Serve a single `status` request with the given lines on a loopback port.
fn spawn_daemon(lines: &'static [&'static str]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut request = [0u8; 8];
        socket.read_exact(&mut request).unwrap();

        let mut body = Vec::new();
        for line in lines {
            body.extend_from_slice(&(line.len() as u16).to_be_bytes());
            body.extend_from_slice(line.as_bytes());
        }
        body.extend_from_slice(&[0, 0]);
        socket.write_all(&body).unwrap();
    });

    port
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Test that the CLI binary exists and shows help.
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("apcupsd2mqtt").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Polls data from apcupsd"))
        .stdout(predicate::str::contains("--apcupsd-host"))
        .stdout(predicate::str::contains("--mqtt-topic"))
        .stdout(predicate::str::contains("--hass-config"))
        .stdout(predicate::str::contains("--dry-run"));
}

/// Test that the CLI shows version information.
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("apcupsd2mqtt").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("apcupsd2mqtt"));
}

/// Test that the state topic is mandatory.
#[test]
fn test_missing_topic_shows_error() {
    let mut cmd = Command::cargo_bin("apcupsd2mqtt").unwrap();
    cmd.env_remove("APCUPSD2MQTT_MQTT_TOPIC");

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--mqtt-topic"));
}

/// Dry run prints the data message and discovery configs.
#[test]
fn test_dry_run_prints_messages() {
    let port = spawn_daemon(&[
        "STATUS   : ONLINE \n",
        "LINEV    : 230.1 Volts\n",
        "LOADPCT  : 12.0 Percent\n",
        "NOMPOWER : 500.0 Watts\n",
    ])
    .to_string();

    let mut cmd = Command::cargo_bin("apcupsd2mqtt").unwrap();
    cmd.args([
        "--apcupsd-host",
        "127.0.0.1",
        "--apcupsd-port",
        port.as_str(),
        "--mqtt-topic",
        "ups/status",
        "--hass-config",
        "--dry-run",
    ]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let messages: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let messages = messages.as_array().unwrap();

    assert_eq!(messages[0]["topic"], "ups/status");
    assert_eq!(messages[0]["retain"], true);
    let report: serde_json::Value =
        serde_json::from_str(messages[0]["payload"].as_str().unwrap()).unwrap();
    assert_eq!(report["currpwr_calc"]["value"].as_f64(), Some(60.0));
    assert_eq!(report["LINEV"]["unit"], "Volts");

    assert!(messages
        .iter()
        .any(|m| m["topic"] == "homeassistant/sensor/UPS-linev/config"));
}

/// Switches can be turned on and off from the environment alone.
#[test]
fn test_switches_from_environment() {
    let port = spawn_daemon(&[
        "STATUS   : ONLINE \n",
        "LINEV    : 230.1 Volts\n",
        "LOADPCT  : 12.0 Percent\n",
        "NOMPOWER : 500.0 Watts\n",
    ])
    .to_string();

    let mut cmd = Command::cargo_bin("apcupsd2mqtt").unwrap();
    cmd.env("APCUPSD2MQTT_APCUPSD_HOST", "127.0.0.1")
        .env("APCUPSD2MQTT_APCUPSD_PORT", port.as_str())
        .env("APCUPSD2MQTT_MQTT_TOPIC", "ups/status")
        .env("APCUPSD2MQTT_HASS_CONFIG", "true")
        .env("APCUPSD2MQTT_DRY_RUN", "true")
        .env("APCUPSD2MQTT_CALCULATE_POWER", "false");

    let output = cmd.assert().success().get_output().stdout.clone();
    let messages: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let messages = messages.as_array().unwrap();

    let report: serde_json::Value =
        serde_json::from_str(messages[0]["payload"].as_str().unwrap()).unwrap();
    assert!(report.get("currpwr_calc").is_none());
    assert!(messages
        .iter()
        .any(|m| m["topic"] == "homeassistant/sensor/UPS-linev/config"));
}

/// An unreachable daemon fails the run before anything is published.
#[test]
fn test_unreachable_daemon_fails() {
    let port = closed_port().to_string();

    let mut cmd = Command::cargo_bin("apcupsd2mqtt").unwrap();
    cmd.args([
        "--apcupsd-host",
        "127.0.0.1",
        "--apcupsd-port",
        port.as_str(),
        "--mqtt-topic",
        "ups/status",
        "--dry-run",
    ]);

    cmd.assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Connection error"));
}
