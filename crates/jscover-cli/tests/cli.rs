//! End-to-end tests for the jscover binary

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn jscover() -> Command {
    Command::cargo_bin("jscover").expect("jscover binary should exist")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_help_lists_subcommands() {
    jscover()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("instrument"))
        .stdout(predicate::str::contains("read-coverage"))
        .stdout(predicate::str::contains("parse"));
}

#[test]
fn test_no_args_fails() {
    jscover().assert().failure();
}

#[test]
fn test_instrument_prints_code() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.js", "var x = 1;\nfoo(x);\n");

    jscover()
        .arg("instrument")
        .arg(&file)
        .args(["--path", "a.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("__cov__marker"))
        .stdout(predicate::str::contains("\"a.js\""))
        .stdout(predicate::str::contains("foo(x)"));
}

#[test]
fn test_instrument_then_read_coverage() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.js", "function f(a) { return a ? 1 : 2; }\nf(true);\n");
    let out = dir.path().join("a.out.js");
    let coverage = dir.path().join("coverage.json");

    jscover()
        .arg("instrument")
        .arg(&file)
        .args(["--path", "src/a.js"])
        .arg("-o")
        .arg(&out)
        .arg("--coverage")
        .arg(&coverage)
        .assert()
        .success();

    let fresh: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&coverage).unwrap()).unwrap();
    assert_eq!(fresh["path"], "src/a.js");
    assert_eq!(fresh["globalVariableName"], "__coverage__");

    let output = jscover().arg("read-coverage").arg(&out).assert().success();
    let recovered: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(recovered, fresh);
}

#[test]
fn test_read_coverage_of_plain_file_fails() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "plain.js", "foo();\n");

    jscover()
        .arg("read-coverage")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no coverage data found"));
}

#[test]
fn test_parse_error_is_reported() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "bad.js", "var = ;\n");

    jscover()
        .arg("instrument")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.js"));
}

#[test]
fn test_config_file_and_flag_override() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.js", "foo();\n");
    let config = write(
        &dir,
        "jscover.json",
        r#"{ "coverageVariable": "__from_config", "coverageGlobalScope": "window" }"#,
    );

    jscover()
        .arg("instrument")
        .arg(&file)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("__from_config"))
        .stdout(predicate::str::contains("return window"));

    jscover()
        .arg("instrument")
        .arg(&file)
        .arg("--config")
        .arg(&config)
        .args(["--coverage-variable", "__from_flag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("__from_flag"))
        .stdout(predicate::str::contains("__from_config").not());
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.js", "foo();\n");
    let config = write(&dir, "bad.json", "{ not json");

    jscover()
        .arg("instrument")
        .arg(&file)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_parse_accepts_modules_by_default() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "m.js", "import a from 'a';\nexport default a;\n");

    jscover().arg("parse").arg(&file).assert().success();
}

#[test]
fn test_source_map_output() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.js", "foo();\n");
    let map = dir.path().join("a.js.map");

    jscover()
        .arg("instrument")
        .arg(&file)
        .args(["--path", "a.js"])
        .arg("--source-map")
        .arg(&map)
        .assert()
        .success();

    let map: serde_json::Value = serde_json::from_str(&fs::read_to_string(&map).unwrap()).unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["sources"], serde_json::json!(["a.js"]));
}

#[test]
fn test_parse_prints_ast() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.js", "foo();\n");

    jscover()
        .arg("parse")
        .arg(&file)
        .arg("--pretty")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"body\""));
}
