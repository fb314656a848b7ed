//! Integration tests for the operator CLI.
//!
//! None of these need a running Elasticsearch: the store commands are only
//! exercised against a port nothing listens on.

use std::net::TcpListener;

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("sanrio-cli").expect("binary exists");
    cmd.env_remove("ELASTICSEARCH_HOST")
        .env_remove("CHARACTER_INDEX")
        .env("RUST_LOG", "off");
    cmd
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

#[test]
fn port_check_reports_open_port() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().unwrap().port();

    cli()
        .args(["port-check", "--host", "127.0.0.1", "--port", &port.to_string()])
        .assert()
        .success()
        .stdout(format!("Port {} on 127.0.0.1 is OPEN\n", port));

    drop(listener);
}

#[test]
fn port_check_reports_closed_port_without_failing() {
    let port = closed_port();

    cli()
        .args([
            "port-check",
            "--host",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "--timeout-secs",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("is CLOSED"));
}

#[test]
fn port_check_requires_host_and_port() {
    cli()
        .args(["port-check", "--host", "127.0.0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--port"));
}

#[test]
fn ping_fails_when_store_is_unreachable() {
    let host = format!("http://127.0.0.1:{}", closed_port());

    cli()
        .args(["ping", "--host", &host])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not reachable"))
        .stderr(predicate::str::contains("after 1 retries"));
}

#[test]
fn ensure_index_reports_attempts_when_unreachable() {
    let host = format!("http://127.0.0.1:{}", closed_port());

    cli()
        .args([
            "ensure-index",
            "--host",
            &host,
            "--retries",
            "2",
            "--delay-secs",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("after 2 retries"));
}

#[test]
fn ensure_index_rejects_zero_retries() {
    cli()
        .args(["ensure-index", "--retries", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--retries"));
}

#[test]
fn help_lists_subcommands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("port-check"))
        .stdout(predicate::str::contains("ping"))
        .stdout(predicate::str::contains("ensure-index"));
}
