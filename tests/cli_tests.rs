//! CLI integration tests
//!
//! These tests verify the CLI commands work correctly by running the binary.

#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

fn cli_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xsd-jsonschema"))
}

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().into_owned()
}

// ============================================================================
// xsd2json / json2xsd
// ============================================================================

#[test]
fn test_cli_xsd2json_stdout() {
    let output = Command::new(cli_bin())
        .args(["xsd2json", &fixture("order.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "xsd2json should succeed");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("stdout should be JSON");
    assert_eq!(value["$schema"], "http://json-schema.org/draft-07/schema#");
    assert!(value["definitions"]["OrderType"].is_object());
    assert!(value["properties"]["order"].is_object());
}

#[test]
fn test_cli_xsd2json_custom_keys() {
    let output = Command::new(cli_bin())
        .args(["xsd2json", "--normalize", "--text-key", "#text", &fixture("order.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "xsd2json should succeed");
    assert!(stdout.contains("\"#text\""), "should use the custom text key");
}

#[test]
fn test_cli_json2xsd_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("order.json");
    let xsd_path = dir.path().join("order.xsd");

    let forward = Command::new(cli_bin())
        .args(["xsd2json", &fixture("order.xsd"), "-o", json_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert!(forward.status.success(), "xsd2json should succeed");
    assert!(json_path.is_file());

    let reverse = Command::new(cli_bin())
        .args(["json2xsd", json_path.to_str().unwrap(), "-o", xsd_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert!(reverse.status.success(), "json2xsd should succeed");

    let compare = Command::new(cli_bin())
        .args(["compare", &fixture("order.xsd"), xsd_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&compare.stdout);
    assert!(compare.status.success(), "reconstruction should be equivalent: {}", stdout);
    assert!(stdout.contains("Schemas are equivalent"));
}

#[test]
fn test_cli_json2xsd_unresolved_reference() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("broken.json");
    std::fs::write(
        &json_path,
        r##"{"type": "object", "properties": {"a": {"$ref": "#/definitions/missing"}}}"##,
    )
    .unwrap();

    let output = Command::new(cli_bin())
        .args(["json2xsd", json_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2), "errors exit with 2");
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("missing"));
}

// ============================================================================
// roundtrip / compare
// ============================================================================

#[test]
fn test_cli_roundtrip_directory() {
    let output = Command::new(cli_bin())
        .args(["roundtrip", &fixture("")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "fixtures should round-trip: {}", stdout);
    assert!(stdout.contains("2 file(s): 2 ok, 0 failed (1 SERES)"));
}

#[test]
fn test_cli_roundtrip_seres_only_parallel() {
    let output = Command::new(cli_bin())
        .args(["roundtrip", "--seres-only", "--parallel", "--timeout", "60", &fixture("")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("seres.xsd [SERES]: ok"));
    assert!(stdout.contains("1 file(s): 1 ok, 0 failed (1 SERES)"));
}

#[test]
fn test_cli_compare_different_schemas() {
    let output = Command::new(cli_bin())
        .args(["compare", &fixture("order.xsd"), &fixture("seres.xsd")])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1), "inequivalent schemas exit with 1");
    assert!(!output.stdout.is_empty());
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_cli_validate_valid() {
    let output = Command::new(cli_bin())
        .args(["validate", "-s", &fixture("order.xsd"), &fixture("order.xml")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "validate should succeed for valid file");
    assert!(stdout.contains("✓ Document is valid"));
}

#[test]
fn test_cli_validate_invalid() {
    let output = Command::new(cli_bin())
        .args(["validate", "-s", &fixture("order.xsd"), &fixture("order.invalid.xml")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success(), "validate should fail for invalid file");
    assert!(stdout.contains("✗ Document is invalid"));
    assert!(stdout.contains("/order/item/quantity"));
}

#[test]
fn test_cli_validate_missing_schema() {
    let output = Command::new(cli_bin())
        .args(["validate", "-s", "nonexistent.xsd", &fixture("order.xml")])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "validate should fail for missing schema");
    assert!(stderr.contains("Error:"));
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_cli_help() {
    let output = Command::new(cli_bin())
        .args(["--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for command in ["xsd2json", "json2xsd", "roundtrip", "compare", "validate"] {
        assert!(stdout.contains(command), "help should list {}", command);
    }
}
