use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
}

fn withgen() -> Command {
    let mut cmd = Command::cargo_bin("withgen").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_generic_chain_passes() {
    withgen()
        .arg("check")
        .arg(fixture("snapshots/thing.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Thing: withName"))
        .stdout(predicate::str::contains("1 mutator(s), 0 error(s)"));
}

#[test]
fn test_check_reports_mismatch_and_fails() {
    withgen()
        .arg("check")
        .arg(fixture("snapshots/invalid.json"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Test: withB"))
        .stderr(predicate::str::contains(
            "[parameter-type-mismatch]: Expected parameter \"a\" of type String, found int",
        ))
        .stderr(predicate::str::contains("Test.withA(int)"));
}

#[test]
fn test_check_multiple_snapshots_in_input_order() {
    let output = withgen()
        .arg("check")
        .arg(fixture("snapshots/point.toml"))
        .arg(fixture("snapshots/thing.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let point = stdout.find("Point: withX").expect("Point listed");
    let thing = stdout.find("Thing: withName").expect("Thing listed");
    assert!(point < thing, "{stdout}");
    assert!(stdout.contains("checked 2 value type(s)"));
}

#[test]
fn test_policy_flag_and_config_file_agree() {
    withgen()
        .args(["check", "--policy", "generalized"])
        .arg(fixture("snapshots/point.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Point: moveTo, withX"));

    withgen()
        .arg("check")
        .arg("--config")
        .arg(fixture("generalized.toml"))
        .arg(fixture("snapshots/point.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Point: moveTo, withX"));
}

#[test]
fn test_prefix_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.toml");
    std::fs::write(
        &path,
        r#"
leaf = "Pet"
[[properties]]
name = "age"
type = "int"
[[members]]
name = "copyAge"
parameters = [{ name = "age", type = "int" }]
returns = "Pet"
modifiers = ["abstract"]
"#,
    )
    .unwrap();

    withgen()
        .args(["check", "--prefix", "copy"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Pet: copyAge"));
}

// ============================================================================
// plan
// ============================================================================

#[test]
fn test_plan_text_shows_reconstruction() {
    withgen()
        .arg("plan")
        .arg(fixture("snapshots/thing.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "@Override @Nullable public final Thing withName(String name) {",
        ))
        .stdout(predicate::str::contains("return new Thing(name, getSize());"));
}

#[test]
fn test_plan_json_output() {
    let output = withgen()
        .args(["plan", "--format", "json", "--policy", "generalized"])
        .arg(fixture("snapshots/point.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let value_type = &json["value_types"][0];
    assert_eq!(value_type["value_type"], "Point");
    assert_eq!(value_type["plans"][0]["method_name"], "moveTo");
    assert_eq!(
        value_type["plans"][0]["arguments"],
        serde_json::json!([
            { "source": "parameter", "name": "x" },
            { "source": "parameter", "name": "y" }
        ])
    );
    assert_eq!(value_type["plans"][1]["arguments"][1]["source"], "accessor");
    assert_eq!(json["diagnostics"], serde_json::json!([]));
}

#[test]
fn test_plan_json_includes_diagnostics() {
    let output = withgen()
        .args(["plan", "--format", "json"])
        .arg(fixture("snapshots/invalid.json"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["diagnostics"][0]["kind"], "parameter-type-mismatch");
    assert_eq!(json["diagnostics"][0]["severity"], "error");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_snapshot() {
    withgen()
        .arg("check")
        .arg(fixture("snapshots/absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load snapshot"));
}

#[test]
fn test_empty_prefix_rejected() {
    withgen()
        .args(["check", "--prefix", ""])
        .arg(fixture("snapshots/thing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid generator settings"));
}

#[test]
fn test_snapshot_required() {
    withgen().arg("check").assert().failure();
}
