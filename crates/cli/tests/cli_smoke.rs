//! CLI smoke tests for v8pack.
//!
//! These tests exercise every command that can run without depot_tools or a
//! network connection, and check exit codes and output.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

fn v8pack_cmd(temp: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("v8pack");
  cmd
    .current_dir(temp.path())
    .env("XDG_CONFIG_HOME", temp.path().join("config"))
    .env("APPDATA", temp.path().join("config"))
    .env_remove("RUST_LOG");
  cmd
}

fn write_version_header(root: &std::path::Path, content: &str) {
  let include = root.join("v8/include");
  std::fs::create_dir_all(&include).unwrap();
  std::fs::write(include.join("v8-version.h"), content).unwrap();
}

const FULL_HEADER: &str = "\
#define V8_MAJOR_VERSION 12
#define V8_MINOR_VERSION 4
#define V8_BUILD_NUMBER 254
#define V8_PATCH_LEVEL 21
";

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let temp = TempDir::new().unwrap();
  v8pack_cmd(&temp)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  let temp = TempDir::new().unwrap();
  v8pack_cmd(&temp)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("v8pack"));
}

#[test]
fn subcommand_help_works() {
  let temp = TempDir::new().unwrap();
  for cmd in &["build", "plan", "version", "info"] {
    v8pack_cmd(&temp)
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// info
// =============================================================================

#[test]
#[serial]
fn info_shows_platform_and_defaults() {
  let temp = TempDir::new().unwrap();
  v8pack_cmd(&temp)
    .arg("info")
    .env_remove("GYP_MSVS_VERSION")
    .assert()
    .success()
    .stdout(predicate::str::contains("platform"))
    .stdout(predicate::str::contains("x64/Debug"))
    .stdout(predicate::str::contains("GYP_MSVS_VERSION: 2022"));
}

#[test]
#[serial]
fn info_json_is_valid() {
  let temp = TempDir::new().unwrap();
  let output = v8pack_cmd(&temp)
    .args(["info", "-o", "json"])
    .env("DEPOT_TOOLS_WIN_TOOLCHAIN", "1")
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["env"]["DEPOT_TOOLS_WIN_TOOLCHAIN"], "1");
  assert!(json["matrix"].as_array().unwrap().len() >= 2);
}

#[test]
#[serial]
fn info_uses_configured_root() {
  let temp = TempDir::new().unwrap();
  let root = temp.path().join("workspace");
  std::fs::write(
    temp.path().join("v8pack.toml"),
    format!("root = '{}'\n", root.display()),
  )
  .unwrap();

  let output = v8pack_cmd(&temp).args(["info", "-o", "json"]).output().unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["root"], root.to_str().unwrap());
  assert_eq!(json["toolchain_dir"], root.join("depot_tools").to_str().unwrap());
  assert_eq!(json["toolchain_ready"], false);
}

// =============================================================================
// plan
// =============================================================================

#[test]
#[serial]
fn plan_full_matrix_lists_cells_without_side_effects() {
  let temp = TempDir::new().unwrap();
  let output = v8pack_cmd(&temp)
    .args(["plan", "--all", "-o", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let cells = json["cells"].as_array().unwrap();
  assert!(cells.len() >= 2);
  assert!(cells.iter().all(|c| c["cached"] == false));
  assert_eq!(cells[0]["out_dir"], "out.gn/x64.debug");
  assert!(!temp.path().join("build").exists());
}

#[test]
#[serial]
fn plan_reads_config_from_working_directory() {
  let temp = TempDir::new().unwrap();
  std::fs::write(
    temp.path().join("v8pack.toml"),
    "debug = true\ntarget_cpu = \"x64\"\n",
  )
  .unwrap();

  v8pack_cmd(&temp)
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("x64/Debug"))
    .stdout(predicate::str::contains("out.gn/x64.debug"));
}

#[test]
#[serial]
fn release_flag_overrides_debug_config() {
  let temp = TempDir::new().unwrap();
  std::fs::write(
    temp.path().join("v8pack.toml"),
    "debug = true\ntarget_cpu = \"x64\"\n",
  )
  .unwrap();

  v8pack_cmd(&temp)
    .args(["plan", "--release"])
    .assert()
    .success()
    .stdout(predicate::str::contains("x64/Release"))
    .stdout(predicate::str::contains("out.gn/x64.release"));

  v8pack_cmd(&temp)
    .args(["plan", "--debug", "--release"])
    .assert()
    .failure();
}

#[test]
#[serial]
fn plan_rejects_unknown_config_key() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("v8pack.toml"), "fulll_matrix = true\n").unwrap();

  v8pack_cmd(&temp)
    .arg("plan")
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("error:"));
}

#[test]
#[serial]
fn plan_rejects_reserved_gn_arg() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("v8pack.toml"), "[gn_args]\nis_debug = true\n").unwrap();

  v8pack_cmd(&temp)
    .arg("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("is_debug"));
}

#[test]
fn plan_rejects_unknown_cpu() {
  let temp = TempDir::new().unwrap();
  v8pack_cmd(&temp)
    .args(["plan", "--cpu", "sparc"])
    .assert()
    .failure();
}

#[test]
#[cfg(not(windows))]
fn msvc_is_rejected_off_windows() {
  let temp = TempDir::new().unwrap();
  v8pack_cmd(&temp)
    .args(["build", "--toolchain", "msvc"])
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("msvc"));
  assert!(!temp.path().join("depot_tools").exists());
}

// =============================================================================
// version
// =============================================================================

#[test]
fn version_prints_header_version() {
  let temp = TempDir::new().unwrap();
  write_version_header(temp.path(), FULL_HEADER);

  v8pack_cmd(&temp)
    .arg("version")
    .assert()
    .success()
    .stdout(predicate::str::contains("12.4.254.21"));
}

#[test]
fn version_defaults_missing_components() {
  let temp = TempDir::new().unwrap();
  write_version_header(temp.path(), "#define V8_MAJOR_VERSION 9\n#define V8_MINOR_VERSION 1\n");

  v8pack_cmd(&temp)
    .args(["version", "--root"])
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("9.1.0.0"))
    .stderr(predicate::str::contains("V8_PATCH_LEVEL"));
}

#[test]
fn version_strict_fails_on_missing_components() {
  let temp = TempDir::new().unwrap();
  write_version_header(temp.path(), "#define V8_MAJOR_VERSION 9\n");

  v8pack_cmd(&temp)
    .args(["version", "--strict"])
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("V8_MINOR_VERSION"));
}

#[test]
fn version_without_checkout_fails() {
  let temp = TempDir::new().unwrap();
  v8pack_cmd(&temp)
    .arg("version")
    .assert()
    .failure()
    .stderr(predicate::str::contains("v8-version.h"));
}
