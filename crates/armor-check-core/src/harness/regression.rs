use super::case::{CaseReport, run_case};
use super::manifest::{FixtureCase, FixtureManifest};
use super::suite::{SuiteReport, run_suite};
use super::workspace::{display_path, resolve_against};
use crate::compare::ComparisonPolicy;
use crate::domain::{HarnessError, HarnessResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct RegressionRunnerConfig {
    pub manifest_path: PathBuf,
    pub tool_path: PathBuf,
    pub fixtures_root: PathBuf,
    pub report_path: PathBuf,
}

impl Default for RegressionRunnerConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("tests/fixture-manifest.json"),
            tool_path: PathBuf::from("build/src/tests/armor/src/armor_debug"),
            fixtures_root: PathBuf::from("src/tests"),
            report_path: PathBuf::from("artifacts/regression/report.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionRunReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub manifest_path: String,
    pub tool_path: String,
    pub fixtures_root: String,
    pub case_count: usize,
    pub passed_case_count: usize,
    pub failed_case_count: usize,
    pub suite_count: usize,
    pub passed_suite_count: usize,
    pub failed_suite_count: usize,
    pub cases: Vec<CaseReport>,
    pub suites: Vec<SuiteReport>,
}

pub fn run_regression(config: &RegressionRunnerConfig) -> HarnessResult<RegressionRunReport> {
    let manifest = FixtureManifest::from_path(&config.manifest_path)?;
    let manifest_dir = config
        .manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let default_policy = match &manifest.default_policy {
        Some(path) => ComparisonPolicy::from_policy_path(resolve_against(&manifest_dir, path))?,
        None => ComparisonPolicy::diff_report()?,
    };

    let mut case_reports = Vec::with_capacity(manifest.cases.len());
    for case in &manifest.cases {
        let fixture_dir = resolve_against(&config.fixtures_root, &case.directory);
        let report = run_manifest_case(config, case, &fixture_dir, &manifest_dir, &default_policy)
            .unwrap_or_else(|error| {
                tracing::warn!(case = %case.id, error = %error, "case aborted");
                CaseReport::aborted(&case.id, &fixture_dir, &error)
            });
        case_reports.push(report);
    }

    let suite_reports = manifest
        .suites
        .iter()
        .map(|suite| {
            let executable = resolve_against(&config.fixtures_root, &suite.executable);
            run_suite(suite, &executable)
        })
        .collect::<Vec<_>>();

    let case_count = case_reports.len();
    let passed_case_count = case_reports.iter().filter(|case| case.passed).count();
    let failed_case_count = case_count.saturating_sub(passed_case_count);
    let suite_count = suite_reports.len();
    let passed_suite_count = suite_reports.iter().filter(|suite| suite.passed).count();
    let failed_suite_count = suite_count.saturating_sub(passed_suite_count);

    let report = RegressionRunReport {
        generated_at_unix_seconds: current_unix_timestamp_seconds(),
        passed: failed_case_count == 0 && failed_suite_count == 0,
        manifest_path: display_path(&config.manifest_path),
        tool_path: display_path(&config.tool_path),
        fixtures_root: display_path(&config.fixtures_root),
        case_count,
        passed_case_count,
        failed_case_count,
        suite_count,
        passed_suite_count,
        failed_suite_count,
        cases: case_reports,
        suites: suite_reports,
    };

    write_report_file(&config.report_path, &report)?;
    Ok(report)
}

pub fn render_human_summary(report: &RegressionRunReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Regression status: {}", status));
    lines.push(format!(
        "Cases: {} total ({} passed, {} failed)",
        report.case_count, report.passed_case_count, report.failed_case_count
    ));
    if report.suite_count > 0 {
        lines.push(format!(
            "Suites: {} total ({} passed, {} failed)",
            report.suite_count, report.passed_suite_count, report.failed_suite_count
        ));
    }

    for case in &report.cases {
        let case_status = if case.passed { "PASS" } else { "FAIL" };
        let passed_checks = case.checks.iter().filter(|check| check.passed).count();
        lines.push(format!(
            "Case {}: {} ({}/{} checks)",
            case.case_id,
            case_status,
            passed_checks,
            case.checks.len()
        ));

        if let Some(failure) = case.first_failure() {
            lines.push(format!(
                "  first failure: [{}] {}",
                failure.placeholder,
                failure.headline()
            ));
        }
    }

    for suite in &report.suites {
        let suite_status = if suite.passed { "PASS" } else { "FAIL" };
        lines.push(format!("Suite {}: {}", suite.suite_id, suite_status));
        if let Some(reason) = &suite.reason {
            lines.push(format!("  reason: {}", reason));
        }
    }

    lines.join("\n")
}

fn run_manifest_case(
    config: &RegressionRunnerConfig,
    case: &FixtureCase,
    fixture_dir: &Path,
    manifest_dir: &Path,
    default_policy: &ComparisonPolicy,
) -> HarnessResult<CaseReport> {
    match &case.policy {
        Some(path) => {
            let policy = ComparisonPolicy::from_policy_path(resolve_against(manifest_dir, path))?;
            run_case(case, &config.tool_path, fixture_dir, &policy)
        }
        None => run_case(case, &config.tool_path, fixture_dir, default_policy),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegressionRunnerError {
    #[error("failed to create report directory '{}': {source}", path.display())]
    ReportDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize report '{}': {source}", path.display())]
    SerializeReport {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write report '{}': {source}", path.display())]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<RegressionRunnerError> for HarnessError {
    fn from(error: RegressionRunnerError) -> Self {
        let message = error.to_string();
        match error {
            RegressionRunnerError::ReportDirectory { .. }
            | RegressionRunnerError::WriteReport { .. } => {
                HarnessError::io_system("IO.REGRESSION_REPORT", message)
            }
            RegressionRunnerError::SerializeReport { .. } => {
                HarnessError::internal("SYS.REGRESSION_REPORT", message)
            }
        }
    }
}

fn write_report_file(
    report_path: &Path,
    report: &RegressionRunReport,
) -> Result<(), RegressionRunnerError> {
    if let Some(parent_dir) = report_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|source| {
            RegressionRunnerError::ReportDirectory {
                path: parent_dir.to_path_buf(),
                source,
            }
        })?;
    }

    let report_json = serde_json::to_string_pretty(report).map_err(|source| {
        RegressionRunnerError::SerializeReport {
            path: report_path.to_path_buf(),
            source,
        }
    })?;
    fs::write(report_path, report_json).map_err(|source| RegressionRunnerError::WriteReport {
        path: report_path.to_path_buf(),
        source,
    })
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
