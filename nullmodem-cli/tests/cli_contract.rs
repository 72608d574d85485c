//! Integration tests for core CLI contract behavior.

use {predicates::prelude::*, std::fs, tempfile::tempdir};

fn cli_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("nullmodem");
    cmd.env_remove("NULLMODEM_ROOT")
        .env_remove("NULLMODEM_TIMEOUT")
        .env_remove("NULLMODEM_NON_INTERACTIVE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("nullmodem"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn short_help_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("remove-all"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn version_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nullmodem"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn short_version_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("-V")
        .assert()
        .success()
        .stdout(predicate::str::contains("nullmodem"))
        .stderr(predicate::str::is_empty());
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn completions_bash_exits_zero() {
    cli_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("nullmodem"));
}

#[test]
fn exit_code_two_for_unknown_command() {
    cli_cmd()
        .arg("unknown-command-xyz")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unrecognized").or(predicate::str::contains("unknown")));
}

#[test]
fn exit_code_two_for_invalid_flag() {
    cli_cmd()
        .arg("--invalid-flag-xyz")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn exit_code_two_for_malformed_port_options() {
    cli_cmd()
        .args(["add", "--a", "PortName", "--b", "PortName=COM6"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unknown_command_suggests_similar() {
    cli_cmd()
        .arg("lsit")
        .assert()
        .failure()
        .stderr(predicate::str::contains("list"));
}

#[test]
fn exit_code_four_when_install_directory_is_missing() {
    let dir = tempdir().expect("tempdir should be created");
    let missing = dir.path().join("com0com");

    cli_cmd()
        .arg("--root")
        .arg(&missing)
        .arg("list")
        .assert()
        .failure()
        .code(4)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn exit_code_four_when_utility_is_missing() {
    let dir = tempdir().expect("tempdir should be created");

    cli_cmd()
        .arg("--root")
        .arg(dir.path())
        .arg("list")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("setupc.exe"));
}

#[test]
fn json_error_keeps_stdout_clean() {
    let dir = tempdir().expect("tempdir should be created");

    cli_cmd()
        .arg("--root")
        .arg(dir.path().join("missing"))
        .args(["list-names", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error"));
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn local_config_file_sets_root() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(
        dir.path().join("nullmodem.toml"),
        "[utility]\nroot = \"configured-root\"\n",
    )
    .expect("write config");

    cli_cmd()
        .current_dir(dir.path())
        .arg("list")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("configured-root"));
}

#[test]
fn explicit_config_path_sets_root() {
    let dir = tempdir().expect("tempdir should be created");
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[utility]\nroot = \"explicit-root\"\n").expect("write config");

    cli_cmd()
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("explicit-root"));
}

#[test]
fn root_flag_overrides_config_file() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(
        dir.path().join("nullmodem.toml"),
        "[utility]\nroot = \"configured-root\"\n",
    )
    .expect("write config");

    cli_cmd()
        .current_dir(dir.path())
        .args(["--root", "flag-root", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("flag-root"))
        .stderr(predicate::str::contains("configured-root").not());
}

#[test]
fn invalid_config_file_is_a_warning() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(dir.path().join("nullmodem.toml"), "invalid toml [[[").expect("write config");

    let output = cli_cmd()
        .current_dir(dir.path())
        .args(["--root", "missing-root", "list"])
        .output()
        .expect("command should execute");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TOML"), "should warn about invalid TOML");
    assert!(
        stderr.contains("missing-root"),
        "should carry on with the flag value"
    );
}

// ============================================================================
// End-to-end against a stand-in setupc (Unix only)
// ============================================================================

#[cfg(unix)]
const FAKE_SETUPC: &str = r#"#!/bin/sh
shift 3
[ "$1" = "--detail-prms" ] && shift
case "$1" in
  help)
    echo "Usage: setupc [options] <command>"
    ;;
  list)
    echo "CNCA0 PortName=COM1,EmuBR=no,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no"
    echo "CNCB0 PortName=COM2,EmuBR=yes,EmuOverrun=no,PlugInMode=no,ExclusiveMode=no,HiddenMode=no,AllDataBits=no"
    ;;
  busynames)
    echo "COM1 COM2"
    ;;
  remove)
    echo "Removed CNCA$2 com0com\\port"
    ;;
esac
"#;

#[cfg(unix)]
fn fake_install(dir: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;

    let utility = dir.join("setupc.exe");
    fs::write(&utility, FAKE_SETUPC).expect("write setupc stand-in");
    fs::set_permissions(&utility, fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[cfg(unix)]
#[test]
fn list_json_writes_pairs_to_stdout() {
    let dir = tempdir().expect("tempdir should be created");
    fake_install(dir.path());

    let output = cli_cmd()
        .current_dir(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["list", "--json"])
        .output()
        .expect("command should execute");
    assert!(output.status.success());

    let pairs: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let pairs = pairs.as_array().expect("JSON array");
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["id"], 0);
    assert_eq!(pairs[0]["name"], "CNCBUS0");
    assert_eq!(pairs[0]["a"]["port_name"], "COM1");
    assert_eq!(pairs[0]["b"]["emulate_baud_rate"], true);
}

#[cfg(unix)]
#[test]
fn list_human_output_goes_to_stderr() {
    let dir = tempdir().expect("tempdir should be created");
    fake_install(dir.path());

    cli_cmd()
        .current_dir(dir.path())
        .arg("--root")
        .arg(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("CNCBUS0"))
        .stderr(predicate::str::contains("EmuBR"));
}

#[cfg(unix)]
#[test]
fn utility_help_is_passed_through() {
    let dir = tempdir().expect("tempdir should be created");
    fake_install(dir.path());

    cli_cmd()
        .current_dir(dir.path())
        .arg("--root")
        .arg(dir.path())
        .arg("utility-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: setupc"));
}

#[cfg(unix)]
#[test]
fn busy_names_json() {
    let dir = tempdir().expect("tempdir should be created");
    fake_install(dir.path());

    let output = cli_cmd()
        .current_dir(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["busy-names", "--json"])
        .output()
        .expect("command should execute");
    let names: Vec<String> = serde_json::from_slice(&output.stdout).expect("JSON array");
    assert_eq!(names, ["COM1", "COM2"]);
}

#[cfg(unix)]
#[test]
fn incomplete_remove_exits_one() {
    let dir = tempdir().expect("tempdir should be created");
    fake_install(dir.path());

    cli_cmd()
        .current_dir(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["remove", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("fully removed"));
}

#[cfg(unix)]
#[test]
fn removing_unknown_pair_exits_one() {
    let dir = tempdir().expect("tempdir should be created");
    fake_install(dir.path());

    cli_cmd()
        .current_dir(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["remove", "9"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pair 9 does not exist"));
}

#[cfg(unix)]
#[test]
fn remove_all_needs_yes_when_non_interactive() {
    let dir = tempdir().expect("tempdir should be created");
    fake_install(dir.path());

    cli_cmd()
        .current_dir(dir.path())
        .arg("--root")
        .arg(dir.path())
        .args(["--non-interactive", "remove-all"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}
