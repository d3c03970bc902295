//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary. Most of them
//! read the resolved `group_id` back through `info --json` to see which
//! file won.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn write_version_file(dir: &Path) {
    fs::write(
        dir.join("package.json"),
        r#"{"name": "widget", "version": "0.9.0-SNAPSHOT"}"#,
    )
    .unwrap();
}

fn toml_config(group_id: &str) -> String {
    format!("[release]\ngroup_id = \"{group_id}\"\nurl = \"http://nexus/repo\"\n")
}

/// Run `info --json` from `dir` and return the resolved group id.
fn resolved_group_id(dir: &Path) -> String {
    let output = cmd()
        .env("NEXUS_RELEASE_LOG_DIR", std::env::temp_dir().join("nexus-release-it-logs"))
        .args(["-C", dir.to_str().unwrap(), "info", "--json"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    json["options"]["group_id"].as_str().unwrap().to_string()
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn doctor_runs_without_config_file() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"found\": false"));
}

#[test]
fn info_without_config_reports_missing_options() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("group_id"));
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(tmp.path().join(".nexus-release.toml"), toml_config("com.dot")).unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.dot");
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(tmp.path().join("nexus-release.toml"), toml_config("com.plain")).unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.plain");
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();
    write_version_file(&sub_dir);
    fs::write(tmp.path().join(".nexus-release.toml"), toml_config("com.parent")).unwrap();

    assert_eq!(resolved_group_id(&sub_dir), "com.parent");
}

#[test]
fn dotfile_takes_precedence_over_regular_name() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(tmp.path().join(".nexus-release.toml"), toml_config("com.dot")).unwrap();
    fs::write(tmp.path().join("nexus-release.toml"), toml_config("com.plain")).unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.dot");
}

#[test]
fn explicit_config_file_overrides_discovery() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(tmp.path().join(".nexus-release.toml"), toml_config("com.found")).unwrap();
    let explicit = tmp.path().join("ci.toml");
    fs::write(&explicit, toml_config("com.explicit")).unwrap();

    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "--config",
            explicit.to_str().unwrap(),
            "info",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.explicit"));
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_yaml_config() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(
        tmp.path().join(".nexus-release.yaml"),
        "release:\n  group_id: com.yaml\n  url: http://nexus/repo\n",
    )
    .unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.yaml");
}

#[test]
fn parses_yml_config() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(
        tmp.path().join(".nexus-release.yml"),
        "release:\n  group_id: com.yml\n  url: http://nexus/repo\n",
    )
    .unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.yml");
}

#[test]
fn parses_json_config() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(
        tmp.path().join(".nexus-release.json"),
        r#"{"release": {"group_id": "com.json", "url": "http://nexus/repo"}}"#,
    )
    .unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.json");
}

#[test]
fn parses_file_mappings_and_flags() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(
        tmp.path().join(".nexus-release.toml"),
        r#"
[release]
group_id = "com.x"
url = "http://nexus/repo"
type = "tgz"
unsecure = true
optional_params = ["-B"]
inject_dest_folder = false

[[release.files]]
src = ["build/**"]
dest = "lib"
cwd = "out"
"#,
    )
    .unwrap();

    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info", "--json"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    let options = &json["options"];
    assert_eq!(options["extension"], "tgz");
    assert_eq!(options["file"], "widget-0.9.0.tgz");
    assert_eq!(options["unsecure"], true);
    assert_eq!(options["optional_params"][0], "-B");
    assert_eq!(options["files"][0]["dest"], "lib");
    assert_eq!(options["files"][0]["cwd"], "out");
}

// =============================================================================
// Config Precedence
// =============================================================================

#[test]
fn closer_config_takes_precedence() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("project");
    fs::create_dir_all(&sub_dir).unwrap();
    write_version_file(&sub_dir);
    fs::write(tmp.path().join(".nexus-release.toml"), toml_config("com.outer")).unwrap();
    fs::write(sub_dir.join(".nexus-release.toml"), toml_config("com.inner")).unwrap();

    assert_eq!(resolved_group_id(&sub_dir), "com.inner");
}

#[test]
fn toml_preferred_over_yaml_in_same_directory() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(tmp.path().join(".nexus-release.toml"), toml_config("com.toml")).unwrap();
    fs::write(
        tmp.path().join(".nexus-release.yaml"),
        "release:\n  group_id: com.yaml\n  url: http://nexus/repo\n",
    )
    .unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.toml");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn invalid_toml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nexus-release.toml"), "this is not valid toml [[[").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn invalid_json_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nexus-release.json"), "{not valid json}").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .failure();
}

#[test]
fn unknown_config_field_is_ignored() {
    let tmp = TempDir::new().unwrap();
    write_version_file(tmp.path());
    fs::write(
        tmp.path().join(".nexus-release.toml"),
        format!("{}unknown_field = 42\n", toml_config("com.x")),
    )
    .unwrap();

    assert_eq!(resolved_group_id(tmp.path()), "com.x");
}

// =============================================================================
// Boundary Marker Tests
// =============================================================================

#[test]
fn git_boundary_stops_config_search() {
    let tmp = TempDir::new().unwrap();
    let parent = tmp.path().join("parent");
    let repo = parent.join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    write_version_file(&src);

    fs::write(parent.join(".nexus-release.toml"), toml_config("com.outside")).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();

    // The parent config is beyond the repository boundary, so nothing is found.
    cmd()
        .args(["-C", src.to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("group_id"));
}

#[test]
fn config_in_same_dir_as_git_is_found() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    write_version_file(&src);

    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(repo.join(".nexus-release.toml"), toml_config("com.repo")).unwrap();

    assert_eq!(resolved_group_id(&src), "com.repo");
}
