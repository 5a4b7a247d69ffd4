// The `rectify` binary: exit codes, output formats and in-place fixing.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

const DOUBLE_NEGATION: &str = "class A {\n  boolean m(boolean p) {\n    return !!p;\n  }\n}\n";
const CLEAN: &str = "class A {\n  boolean m(boolean p) {\n    return p;\n  }\n}\n";

fn rectify() -> Command {
    Command::cargo_bin("rectify").unwrap()
}

#[test]
fn check_reports_findings_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("A.java"), DOUBLE_NEGATION).unwrap();

    rectify()
        .arg("check")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(contains("EqualityRules.DoubleNegation").and(contains("1 file(s) checked")));
}

#[test]
fn check_passes_on_clean_sources() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("A.java"), CLEAN).unwrap();

    rectify().arg("check").arg(dir.path()).assert().success();
}

#[test]
fn check_emits_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("A.java");
    fs::write(&file, DOUBLE_NEGATION).unwrap();

    let output = rectify()
        .args(["--format", "json", "check"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let first = &json[0];
    assert_eq!(first["check"], "EqualityRules.DoubleNegation");
    assert_eq!(first["line"], 3);
    assert_eq!(first["column"], 12);
    assert_eq!(first["severity"], "suggestion");
}

#[test]
fn fix_rewrites_files_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("A.java");
    fs::write(&file, DOUBLE_NEGATION).unwrap();

    rectify().arg("fix").arg(dir.path()).assert().success();
    assert_eq!(fs::read_to_string(&file).unwrap(), CLEAN);
}

#[test]
fn dry_run_prints_a_diff_and_keeps_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("A.java");
    fs::write(&file, DOUBLE_NEGATION).unwrap();

    rectify()
        .args(["fix", "--dry-run"])
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("-    return !!p;").and(contains("+    return p;")));
    assert_eq!(fs::read_to_string(&file).unwrap(), DOUBLE_NEGATION);
}

#[test]
fn disabled_checks_are_respected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("A.java");
    fs::write(&file, DOUBLE_NEGATION).unwrap();
    let config = dir.path().join("rectify.yaml");
    fs::write(&config, "disabled: [EqualityRules.DoubleNegation]\n").unwrap();

    rectify()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&file)
        .assert()
        .success();
}

#[test]
fn checks_lists_checkers_and_rules() {
    rectify()
        .arg("checks")
        .assert()
        .success()
        .stdout(contains("JUnitValueSource").and(contains("StreamRules.Joining")));
}

#[test]
fn parse_errors_are_rendered_with_miette() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("A.java");
    fs::write(&file, "class A {\n  int\n").unwrap();

    rectify()
        .arg("parse")
        .arg(&file)
        .assert()
        .code(2)
        .stderr(contains("rectify::parse"));
}

#[test]
fn malformed_flags_are_configuration_errors() {
    rectify()
        .args(["--flag", "NoColon", "checks"])
        .assert()
        .code(2)
        .stderr(contains("Check:Flag=value"));
}
