use super::artifacts::{
    ArtifactRole, golden_path, produced_path, read_json_artifact, read_text_artifact,
    remove_stale_artifact,
};
use super::manifest::FixtureCase;
use super::tool::{ToolInvocation, run_tool};
use super::workspace::display_path;
use crate::compare::{
    ComparisonOutcome, ComparisonPolicy, compare_diff_report, compare_lines_with,
    missing_report_fields, split_report_lines,
};
use crate::domain::{ArtifactKind, HarnessError, HarnessErrorCategory, HarnessResult};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub category: HarnessErrorCategory,
    pub placeholder: &'static str,
    pub message: String,
}

impl FailureRecord {
    /// First line of the message, for one-line summaries.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

impl From<&HarnessError> for FailureRecord {
    fn from(error: &HarnessError) -> Self {
        Self {
            category: error.category(),
            placeholder: error.placeholder(),
            message: error.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub artifact: ArtifactKind,
    pub golden_path: String,
    pub produced_path: String,
    pub passed: bool,
    pub failure: Option<FailureRecord>,
    pub comparison: ComparisonOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub case_id: String,
    pub directory: String,
    pub passed: bool,
    /// Set when the case aborted before its artifacts could be compared.
    pub failure: Option<FailureRecord>,
    pub checks: Vec<CheckReport>,
}

impl CaseReport {
    pub fn aborted(case_id: &str, fixture_dir: &Path, error: &HarnessError) -> Self {
        Self {
            case_id: case_id.to_string(),
            directory: display_path(fixture_dir),
            passed: false,
            failure: Some(FailureRecord::from(error)),
            checks: Vec::new(),
        }
    }

    pub fn first_failure(&self) -> Option<&FailureRecord> {
        self.failure.as_ref().or_else(|| {
            self.checks
                .iter()
                .find_map(|check| check.failure.as_ref())
        })
    }
}

/// Runs the tool for one fixture case and compares every produced artifact
/// with its golden counterpart.
///
/// Goldens are loaded before the tool runs. Tool failures and missing
/// produced artifacts are returned as errors before any comparison happens;
/// mismatches are recorded in the returned report.
pub fn run_case(
    case: &FixtureCase,
    tool_path: &Path,
    fixture_dir: &Path,
    policy: &ComparisonPolicy,
) -> HarnessResult<CaseReport> {
    let span = tracing::info_span!("case", id = %case.id);
    let _guard = span.enter();

    if !fixture_dir.is_dir() {
        return Err(HarnessError::invalid_configuration(
            "CONFIG.FIXTURE_DIRECTORY",
            format!(
                "fixture directory '{}' for case '{}' does not exist",
                fixture_dir.display(),
                case.id
            ),
        ));
    }

    let golden_report_path = golden_path(fixture_dir, ArtifactKind::DiffReport);
    let golden_text_path = golden_path(fixture_dir, ArtifactKind::TextReport);
    let produced_report_path = produced_path(fixture_dir, &case.header, ArtifactKind::DiffReport);
    let produced_text_path = produced_path(fixture_dir, &case.header, ArtifactKind::TextReport);

    let golden_report = if case.dump_ast_diff {
        Some(read_json_artifact(&golden_report_path, ArtifactRole::Golden)?)
    } else {
        None
    };
    let golden_text = if case.compare_text_report {
        Some(read_text_artifact(&golden_text_path, ArtifactRole::Golden)?)
    } else {
        None
    };

    if case.dump_ast_diff {
        remove_stale_artifact(&produced_report_path)?;
    }
    if case.compare_text_report {
        remove_stale_artifact(&produced_text_path)?;
    }

    let mut invocation = ToolInvocation::for_fixture(fixture_dir, case.header.clone());
    invocation.include_paths = case.include_paths.clone();
    invocation.macro_flags = case.macro_flags.clone();
    invocation.dump_ast_diff = case.dump_ast_diff;
    invocation.report_format = case.report_format;
    let tool_run = run_tool(tool_path, fixture_dir, &invocation)?;
    if !tool_run.stderr.trim().is_empty() {
        tracing::debug!(stderr = %tool_run.stderr.trim_end(), "ast-diff tool wrote diagnostics");
    }
    tracing::trace!(stdout = %tool_run.stdout.trim_end(), "ast-diff tool output");

    let mut checks = Vec::with_capacity(2);
    if let Some(golden_report) = golden_report {
        let produced_report = read_json_artifact(&produced_report_path, ArtifactRole::Produced)?;
        let comparison = compare_diff_report(&golden_report, &produced_report, policy);
        let failure = diff_report_failure(&produced_report, &comparison, &produced_report_path);
        checks.push(CheckReport {
            artifact: ArtifactKind::DiffReport,
            golden_path: display_path(&golden_report_path),
            produced_path: display_path(&produced_report_path),
            passed: failure.is_none(),
            failure,
            comparison,
        });
    }

    if let Some(golden_text) = golden_text {
        let produced_text = read_text_artifact(&produced_text_path, ArtifactRole::Produced)?;
        let comparison = compare_lines_with(
            &split_report_lines(&golden_text),
            &split_report_lines(&produced_text),
            policy.collection(),
        );
        let failure = comparison
            .clone()
            .into_result("CHECK.TEXT_REPORT", &display_path(&produced_text_path))
            .err()
            .map(|error| FailureRecord::from(&error));
        checks.push(CheckReport {
            artifact: ArtifactKind::TextReport,
            golden_path: display_path(&golden_text_path),
            produced_path: display_path(&produced_text_path),
            passed: failure.is_none(),
            failure,
            comparison,
        });
    }

    let passed = checks.iter().all(|check| check.passed);
    tracing::info!(passed, checks = checks.len(), "case finished");
    Ok(CaseReport {
        case_id: case.id.clone(),
        directory: display_path(fixture_dir),
        passed,
        failure: None,
        checks,
    })
}

fn diff_report_failure(
    produced_report: &serde_json::Value,
    comparison: &ComparisonOutcome,
    produced_report_path: &Path,
) -> Option<FailureRecord> {
    let subject = display_path(produced_report_path);
    if let Err(error) = comparison.clone().into_result("CHECK.DIFF_REPORT", &subject) {
        return Some(FailureRecord::from(&error));
    }

    let missing = missing_report_fields(produced_report);
    if missing.is_empty() {
        return None;
    }
    Some(FailureRecord::from(&HarnessError::schema_mismatch(
        "CHECK.REQUIRED_FIELDS",
        format!(
            "{} lacks required fields [{}]",
            subject,
            missing.join(", ")
        ),
    )))
}
