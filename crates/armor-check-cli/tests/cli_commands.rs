use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const GOLDEN_REPORT: &str = r#"{
  "astDiff": [
    { "name": "Point", "tag": "modified" },
    { "name": "legacy_init", "tag": "removed" }
  ],
  "parsed_status": { "mylib.h": "parsed" },
  "unparsed_status": { "mylib.h": [] },
  "headerResolutionFailures": [
    { "file": "/home/a/checkout/armor/src/tests/alpha/functional/fatal_errors/v1/mylib.h", "header": "missing.h" }
  ]
}"#;

const RELOCATED_REPORT: &str = r#"{
  "astDiff": [
    { "name": "legacy_init", "tag": "removed" },
    { "name": "Point", "tag": "modified" }
  ],
  "parsed_status": { "mylib.h": "parsed" },
  "unparsed_status": { "mylib.h": [] },
  "headerResolutionFailures": [
    { "file": "/ci/runner/build/armor/src/tests/alpha/functional/fatal_errors/v1/mylib.h", "header": "missing.h" }
  ]
}"#;

#[test]
fn compare_command_accepts_reordered_relocated_report() {
    let temp = TempDir::new().expect("tempdir should be created");
    let expected = temp.path().join("expected_output.json");
    let actual = temp.path().join("ast_diff_output_mylib.h.json");
    write_file(&expected, GOLDEN_REPORT);
    write_file(&actual, RELOCATED_REPORT);

    let output = run_cli(&[
        OsStr::new("compare"),
        expected.as_os_str(),
        actual.as_os_str(),
    ]);
    assert!(
        output.status.success(),
        "compare should pass, stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("PASS: "));
}

#[test]
fn compare_command_strict_mode_rejects_reordering() {
    let temp = TempDir::new().expect("tempdir should be created");
    let expected = temp.path().join("expected_output.json");
    let actual = temp.path().join("actual.json");
    let outcome_path = temp.path().join("out/outcome.json");
    write_file(&expected, GOLDEN_REPORT);
    write_file(&actual, RELOCATED_REPORT);

    let output = run_cli(&[
        OsStr::new("compare"),
        expected.as_os_str(),
        actual.as_os_str(),
        OsStr::new("--strict"),
        OsStr::new("--output"),
        outcome_path.as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAIL: [CHECK.DIFF_REPORT]"));

    let outcome: Value = serde_json::from_str(
        &fs::read_to_string(&outcome_path).expect("outcome file should be written"),
    )
    .expect("outcome should parse");
    assert_eq!(outcome["matched"], Value::Bool(false));
    assert!(
        outcome["mismatches"]
            .as_array()
            .is_some_and(|mismatches| !mismatches.is_empty())
    );
}

#[test]
fn compare_command_reports_missing_field_as_schema_mismatch() {
    let temp = TempDir::new().expect("tempdir should be created");
    let expected = temp.path().join("expected_output.json");
    let actual = temp.path().join("actual.json");
    write_file(&expected, GOLDEN_REPORT);
    write_file(
        &actual,
        &RELOCATED_REPORT.replace("\"unparsed_status\": { \"mylib.h\": [] },", ""),
    );

    let output = run_cli(&[OsStr::new("compare"), expected.as_os_str(), actual.as_os_str()]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("missing [unparsed_status]"), "stdout: {}", stdout);
}

#[test]
fn compare_command_missing_produced_file_is_tool_failure() {
    let temp = TempDir::new().expect("tempdir should be created");
    let expected = temp.path().join("expected_output.json");
    write_file(&expected, GOLDEN_REPORT);
    let actual = temp.path().join("debug_output/ast_diffs/ast_diff_output_mylib.h.json");

    let output = run_cli(&[OsStr::new("compare"), expected.as_os_str(), actual.as_os_str()]);
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [TOOL.MISSING_ARTIFACT]"), "stderr: {}", stderr);
    assert!(stderr.contains("FATAL EXIT CODE: 4"));
}

#[test]
fn lines_command_reports_first_divergence_and_length() {
    let temp = TempDir::new().expect("tempdir should be created");
    let expected = temp.path().join("expected_output.txt");
    let actual = temp.path().join("output.txt");
    write_file(&expected, "Header: mylib.h\nRemoved: legacy_init\n");
    write_file(&actual, "Header: mylib.h\nRemoved: legacy_init\nextra");

    let output = run_cli(&[OsStr::new("lines"), expected.as_os_str(), actual.as_os_str()]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("file length differs: expected 2 lines, got 3 lines"),
        "stdout: {}",
        stdout
    );

    let same = run_cli(&[OsStr::new("lines"), expected.as_os_str(), expected.as_os_str()]);
    assert!(same.status.success());
}

#[test]
fn normalize_path_command_prints_tail() {
    let output = run_cli(&[
        OsStr::new("normalize-path"),
        OsStr::new("/home/a/proj/src/x/y/h.h"),
        OsStr::new("--segments"),
        OsStr::new("5"),
    ]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "proj/src/x/y/h.h");

    let invalid = run_cli(&[
        OsStr::new("normalize-path"),
        OsStr::new("/a/b"),
        OsStr::new("--segments"),
        OsStr::new("0"),
    ]);
    assert_eq!(invalid.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&invalid.stderr).contains("CONFIG.COMPARISON_POLICY"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let output = run_cli(&[OsStr::new("frobnicate")]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: [CONFIG.CLI_USAGE]"));

    let help = run_cli(&[OsStr::new("--help")]);
    assert!(help.status.success());
    assert!(String::from_utf8_lossy(&help.stdout).contains("normalize-path"));
}

#[cfg(unix)]
#[test]
fn run_command_executes_manifest_with_fake_tool() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("tempdir should be created");
    let fixtures_root = temp.path().join("src/tests");
    let manifest_path = temp.path().join("tests/fixture-manifest.json");
    let report_path = temp.path().join("artifacts/report.json");
    let tool_path = temp.path().join("build/src/tests/armor/src/armor_debug");

    write_file(
        &tool_path,
        "#!/bin/sh\n\
         mkdir -p debug_output/ast_diffs\n\
         cp produced.json \"debug_output/ast_diffs/ast_diff_output_$3.json\"\n",
    );
    fs::set_permissions(&tool_path, fs::Permissions::from_mode(0o755))
        .expect("fake tool should be executable");

    let case_dir = fixtures_root.join("alpha/functional/fatal_errors");
    fs::create_dir_all(case_dir.join("v1")).expect("v1 should be created");
    fs::create_dir_all(case_dir.join("v2")).expect("v2 should be created");
    write_file(&case_dir.join("expected_output.json"), GOLDEN_REPORT);
    write_file(&case_dir.join("produced.json"), RELOCATED_REPORT);
    write_file(
        &manifest_path,
        r#"{ "cases": [{ "id": "fatal_errors", "directory": "alpha/functional/fatal_errors", "includePaths": ["include"] }] }"#,
    );

    // No --tool: the tool is found under the nearest ancestor holding `build/`.
    let output = Command::new(env!("CARGO_BIN_EXE_armor-check"))
        .current_dir(temp.path())
        .arg("run")
        .arg("--report")
        .arg(&report_path)
        .output()
        .expect("run command should start");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "run should pass, stdout: {}, stderr: {}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Regression status: PASS"));
    assert!(stdout.contains("Case fatal_errors: PASS (1/1 checks)"));

    let report: Value = serde_json::from_str(
        &fs::read_to_string(&report_path).expect("report should be written"),
    )
    .expect("report should parse");
    assert_eq!(report["passed"], Value::Bool(true));
    assert_eq!(report["cases"][0]["checks"][0]["artifact"], "diff_report");
}

#[test]
fn run_command_with_missing_manifest_is_io_failure() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(&[
        OsStr::new("run"),
        OsStr::new("--manifest"),
        temp.path().join("missing.json").as_os_str(),
        OsStr::new("--tool"),
        temp.path().join("armor").as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("IO.FIXTURE_MANIFEST"));
}

fn run_cli(args: &[&OsStr]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_armor-check"))
        .args(args)
        .output()
        .expect("armor-check should run")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}
