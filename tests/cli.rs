use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::cargo_bin("reel-tui")
        .expect("locate reel-tui binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("reel-tui")
        .expect("locate reel-tui binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reel"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--endpoint"));
}

#[test]
fn rejects_unknown_arguments() {
    Command::cargo_bin("reel-tui")
        .expect("locate reel-tui binary")
        .arg("--frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn endpoint_requires_value() {
    Command::cargo_bin("reel-tui")
        .expect("locate reel-tui binary")
        .arg("--endpoint")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("a value is required"));
}
