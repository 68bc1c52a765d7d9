//! CLI regression tests for the `zero` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, environment fallbacks and exit codes.
//!
//! Run with: `cargo test -p zero-test`
//! Requires the `zero` binary to be built first (`cargo build -p zero`).

use assert_cmd::Command;
use predicates::str::contains;

/// Returns an assert_cmd Command wrapping the `zero` binary.
fn zero() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("zero").expect("zero binary not found, run `cargo build -p zero` first")
}

// ---------------------------------------------------------------------------
// zero routes
// ---------------------------------------------------------------------------

#[test]
fn routes_lists_demo_application() {
    zero()
        .arg("routes")
        .assert()
        .success()
        .stdout(contains("/hello/:name"))
        .stdout(contains("/assets/*filepath"))
        .stdout(contains("/v1/hello"))
        .stdout(contains("/v2/login"));
}

#[test]
fn routes_with_static_adds_wildcard_route() {
    zero()
        .args(["routes", "--with-static"])
        .assert()
        .success()
        .stdout(contains("/static/*filepath"));
}

// ---------------------------------------------------------------------------
// zero serve
// ---------------------------------------------------------------------------

#[test]
fn serve_invalid_listen_exits_one() {
    zero()
        .args(["serve", "--listen", "not-an-address", "--log-format", "pretty"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid listen address"));
}

#[test]
fn serve_reads_listen_from_env() {
    zero()
        .arg("serve")
        .env("ZERO_LISTEN", "also-not-an-address")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("also-not-an-address"));
}

#[test]
fn serve_unknown_log_format_exits_two() {
    zero()
        .args(["serve", "--log-format", "xml"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn serve_invalid_max_body_size_exits_two() {
    zero()
        .args(["serve", "--max-body-size", "lots"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn serve_reads_max_body_size_from_env() {
    zero()
        .args(["serve", "--listen", "not-an-address"])
        .env("ZERO_MAX_BODY_SIZE", "lots")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("max-body-size"));
}

#[test]
fn unknown_subcommand_exits_two() {
    zero().arg("compile").assert().failure().code(2);
}

#[test]
fn version_flag_succeeds() {
    zero()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("zero"));
}
