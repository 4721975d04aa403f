//! Integration tests for the `robotcode` CLI binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn cli() -> Command {
    Command::cargo_bin("robotcode").unwrap()
}

#[test]
fn help_lists_transport_and_workspace_flags() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--transport"))
        .stdout(predicate::str::contains("--workspace"));
}

#[test]
fn version_matches_crate_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn rejects_unknown_transport_value() {
    cli()
        .args(["--transport", "carrier-pigeon"])
        .assert()
        .failure();
}
