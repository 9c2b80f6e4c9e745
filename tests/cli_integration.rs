//! End-to-end tests for the `ipvl` binary.
//!
//! Each test runs with `HOME` and `XDG_CONFIG_HOME` pointed at a scratch
//! directory so a developer's own config file never leaks in.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Get a command for running ipvl with an isolated config environment.
fn ipvl(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ipvl").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("IPVL_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("package.json")
        .write_str(r#"{"name": "cli-demo", "description": "demo", "author": "Lin"}"#)
        .unwrap();
    dir.child("src/main.js").write_str("console.log(1);\n").unwrap();
    dir.child("dist/out.js").write_str("// built\n").unwrap();
    dir.child(".ipvlignore").write_str("dist/\n").unwrap();
    dir
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    ipvl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish"))
        .stdout(predicate::str::contains("update"));
}

#[test]
fn publish_prints_keys() {
    let home = TempDir::new().unwrap();
    let dir = project();

    ipvl(&home)
        .arg("publish")
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Published version 1.0.0"))
        .stdout(predicate::str::is_match("Public key: +[0-9a-f]{64}").unwrap())
        .stdout(predicate::str::is_match("Discovery key: +[0-9a-f]{64}").unwrap())
        .stdout(predicate::str::contains("(keep secret)"));

    dir.child(".ipvl/data/1.0.0/src/main.js")
        .assert(predicate::path::is_file());
    dir.child(".ipvl/data/1.0.0/dist")
        .assert(predicate::path::missing());
    dir.child(".ipvl/log/entries.jsonl")
        .assert(predicate::str::contains("\"version\":\"1.0.0\""));
}

#[test]
fn quiet_prints_only_keys() {
    let home = TempDir::new().unwrap();
    let dir = project();

    ipvl(&home)
        .args(["publish", "-q"])
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Published").not())
        .stdout(predicate::str::contains("Public key:"));
}

#[test]
fn second_publish_needs_force() {
    let home = TempDir::new().unwrap();
    let dir = project();
    ipvl(&home)
        .arg("publish")
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .success();

    ipvl(&home)
        .arg("publish")
        .arg(dir.path())
        .arg("2.0.0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already published"))
        .stderr(predicate::str::contains("--force"));
    dir.child(".ipvl/data/2.0.0").assert(predicate::path::missing());

    ipvl(&home)
        .arg("publish")
        .arg(dir.path())
        .arg("2.0.0")
        .arg("--force")
        .assert()
        .success();
    dir.child(".ipvl/data/1.0.0").assert(predicate::path::missing());
    dir.child(".ipvl/data/2.0.0").assert(predicate::path::is_dir());
}

#[test]
fn update_adds_version() {
    let home = TempDir::new().unwrap();
    let dir = project();
    ipvl(&home)
        .arg("publish")
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .success();

    ipvl(&home)
        .arg("update")
        .arg(dir.path())
        .arg("1.1.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated version 1.1.0"));

    dir.child(".ipvl/data/1.0.0").assert(predicate::path::is_dir());
    dir.child(".ipvl/data/1.1.0/src/main.js")
        .assert(predicate::path::is_file());
}

#[test]
fn update_before_publish_fails() {
    let home = TempDir::new().unwrap();
    let dir = project();

    ipvl(&home)
        .arg("update")
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ipvl publish"));

    dir.child(".ipvl").assert(predicate::path::missing());
}

#[test]
fn missing_path_fails() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();

    ipvl(&home)
        .arg("publish")
        .arg(dir.path().join("absent"))
        .arg("1.0.0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn invalid_version_fails() {
    let home = TempDir::new().unwrap();
    let dir = project();

    ipvl(&home)
        .arg("publish")
        .arg(dir.path())
        .arg("a/b")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid version"));
}

#[test]
fn relative_path_resolves_against_cwd_flag() {
    let home = TempDir::new().unwrap();
    let dir = project();

    ipvl(&home)
        .args(["--cwd"])
        .arg(dir.path())
        .args(["publish", ".", "1.0.0", "--log-backend", "memory"])
        .assert()
        .success();

    dir.child(".ipvl/data/1.0.0").assert(predicate::path::is_dir());
    dir.child(".ipvl/log/entries.jsonl")
        .assert(predicate::path::missing());
}

#[test]
fn config_file_selects_backend() {
    let home = TempDir::new().unwrap();
    let config = home.child("custom.toml");
    config.write_str("[log]\nbackend = \"memory\"\n").unwrap();
    let dir = project();

    ipvl(&home)
        .env("IPVL_CONFIG", config.path())
        .arg("publish")
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .success();

    dir.child(".ipvl/log/identity.json")
        .assert(predicate::path::missing());
}

#[test]
fn debug_reports_config_file_and_backend_case_is_ignored() {
    let home = TempDir::new().unwrap();
    let config = home.child("custom.toml");
    config.write_str("[log]\nbackend = \"MEMORY\"\n").unwrap();
    let dir = project();

    ipvl(&home)
        .env("IPVL_CONFIG", config.path())
        .arg("--debug")
        .arg("publish")
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .success()
        .stderr(predicate::str::contains("using config"))
        .stderr(predicate::str::contains("custom.toml"));

    dir.child(".ipvl/log/identity.json")
        .assert(predicate::path::missing());
}

#[test]
fn invalid_config_fails() {
    let home = TempDir::new().unwrap();
    home.child("ipvl/config.toml")
        .write_str("[snapshot]\nconcurrency = 0\n")
        .unwrap();
    let dir = project();

    ipvl(&home)
        .arg("publish")
        .arg(dir.path())
        .arg("1.0.0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));

    dir.child(".ipvl").assert(predicate::path::missing());
}

#[test]
fn completion_generates_script() {
    let home = TempDir::new().unwrap();
    ipvl(&home)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ipvl"));
}
