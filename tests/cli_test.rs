//! Integration tests for the command-line interface.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const QUICK_CONFIG: &str = "likwid_enable: false\ncommand_timeout_secs: 5\n";

/// A command isolated from the user's configuration directory.
fn machinestate(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("machinestate"));
    cmd.env("XDG_CONFIG_HOME", temp.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_config(temp: &TempDir, content: &str) -> std::path::PathBuf {
    let path = temp.path().join("machinestate.yml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    machinestate(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--extended"))
        .stdout(predicate::str::contains("--anonymous"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    machinestate(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_config_prints_effective_configuration() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = write_config(&temp, "indent: 2\n");
    machinestate(&temp)
        .arg("--configfile")
        .arg(&config)
        .args(["-c", "-e"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extended: true"))
        .stdout(predicate::str::contains("indent: 2"));
    Ok(())
}

#[test]
fn cli_missing_reference_exits_with_two() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    machinestate(&temp)
        .args(["-j", "/nonexistent/reference.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("reference document"));
    Ok(())
}

#[test]
fn cli_missing_configfile_exits_with_two() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    machinestate(&temp)
        .args(["--configfile", "/nonexistent/machinestate.yml"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn cli_malformed_configfile_exits_with_two() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = write_config(&temp, "indent: [oops");
    machinestate(&temp)
        .arg("--configfile")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error"));
    Ok(())
}

#[test]
fn cli_non_executable_target_exits_with_two() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let target = temp.path().join("notes.txt");
    fs::write(&target, "plain text")?;
    machinestate(&temp)
        .arg(&target)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not an executable"));
    Ok(())
}

#[test]
fn cli_bad_indent_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    machinestate(&temp).args(["-i", "wide"]).assert().failure();
    Ok(())
}

#[test]
fn cli_collects_a_document_with_metadata() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = write_config(&temp, QUICK_CONFIG);
    let output = machinestate(&temp)
        .arg("--configfile")
        .arg(&config)
        .args(["-i", "0"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let document: serde_json::Value = serde_json::from_slice(&output)?;
    assert!(document["_meta"]
        .as_str()
        .is_some_and(|meta| meta.starts_with("MachineState(")));
    assert!(document.get("HostInfo").is_some());
    Ok(())
}

#[test]
fn cli_writes_output_file_and_matches_it() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = write_config(&temp, QUICK_CONFIG);
    let reference = temp.path().join("state.json");

    machinestate(&temp)
        .arg("--configfile")
        .arg(&config)
        .arg("-o")
        .arg(&reference)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(reference.exists());

    machinestate(&temp)
        .arg("--configfile")
        .arg(&config)
        .arg("-j")
        .arg(&reference)
        .assert()
        .success()
        .stdout(predicate::str::contains("The current state matches the reference"));
    Ok(())
}

#[test]
fn cli_mismatch_exits_with_one() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = write_config(&temp, QUICK_CONFIG);
    let reference = temp.path().join("other.json");
    fs::write(&reference, r#"{"_meta": "SomeOtherMachine()"}"#)?;

    machinestate(&temp)
        .arg("--configfile")
        .arg(&config)
        .arg("-j")
        .arg(&reference)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("_meta"));
    Ok(())
}
