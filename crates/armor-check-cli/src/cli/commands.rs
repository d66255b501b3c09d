use super::CliError;
use super::helpers::*;
use armor_check_core::compare::{
    ComparisonOutcome, DEFAULT_PATH_TAIL_SEGMENTS, MismatchCollection, compare_diff_report,
    compare_lines_with, compare_structured, normalize_path, split_report_lines,
};
use armor_check_core::domain::HarnessError;
use armor_check_core::harness::artifacts::{ArtifactRole, read_json_artifact, read_text_artifact};
use armor_check_core::harness::{RegressionRunnerConfig, render_human_summary, run_regression};
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Fixture manifest path
    #[arg(long, default_value = "tests/fixture-manifest.json")]
    manifest: PathBuf,

    /// AST-diff tool executable [default: build/src/tests/armor/src/armor_debug
    /// under the nearest ancestor holding a `build` directory]
    #[arg(long)]
    tool: Option<PathBuf>,

    /// Root that manifest case directories and suite executables are relative to
    #[arg(long, default_value = "src/tests")]
    fixtures_root: PathBuf,

    /// JSON report output path
    #[arg(long, default_value = "artifacts/regression/report.json")]
    report: PathBuf,
}

impl RunArgs {
    fn into_config(self) -> Result<RegressionRunnerConfig, CliError> {
        let working_dir = current_working_dir()?;
        let tool_path = match self.tool {
            Some(tool) => resolve_cli_path(&working_dir, &tool),
            None => discover_tool_path(&working_dir)?,
        };
        Ok(RegressionRunnerConfig {
            manifest_path: resolve_cli_path(&working_dir, &self.manifest),
            tool_path,
            fixtures_root: resolve_cli_path(&working_dir, &self.fixtures_root),
            report_path: resolve_cli_path(&working_dir, &self.report),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum CompareMode {
    /// Top-level key-set check, then structural comparison
    Report,
    /// Structural comparison only
    Structured,
}

#[derive(clap::Args)]
pub(super) struct CompareArgs {
    /// Golden JSON file
    expected: PathBuf,

    /// Produced JSON file
    actual: PathBuf,

    /// Comparison policy JSON [default: built-in diff-report policy]
    #[arg(long, conflicts_with = "strict")]
    policy: Option<PathBuf>,

    /// Exact, order-sensitive comparison without path normalization
    #[arg(long)]
    strict: bool,

    /// Comparison mode
    #[arg(long, value_enum, default_value_t = CompareMode::Report)]
    mode: CompareMode,

    /// Write the comparison outcome as JSON to this path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct LinesArgs {
    /// Golden text report
    expected: PathBuf,

    /// Produced text report
    actual: PathBuf,

    /// Stop at the first differing line
    #[arg(long)]
    first: bool,

    /// Write the comparison outcome as JSON to this path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct NormalizePathArgs {
    /// Path to normalize
    path: String,

    /// Number of trailing segments to keep
    #[arg(long, default_value_t = DEFAULT_PATH_TAIL_SEGMENTS)]
    segments: usize,
}

pub(super) fn run_regression_command(args: RunArgs) -> Result<i32, CliError> {
    let config = args.into_config()?;
    let report = run_regression(&config)?;
    println!("{}", render_human_summary(&report));
    println!("JSON report: {}", config.report_path.display());

    if report.passed { Ok(0) } else { Ok(1) }
}

pub(super) fn run_compare_command(args: CompareArgs) -> Result<i32, CliError> {
    let policy = load_policy(args.policy.as_deref(), args.strict)?;
    let expected = read_json_artifact(&args.expected, ArtifactRole::Golden)
        .map_err(HarnessError::from)?;
    let actual = read_json_artifact(&args.actual, ArtifactRole::Produced)
        .map_err(HarnessError::from)?;

    let outcome = match args.mode {
        CompareMode::Report => compare_diff_report(&expected, &actual, &policy),
        CompareMode::Structured => compare_structured(&expected, &actual, &policy),
    };
    tracing::debug!(
        mismatches = outcome.mismatches.len(),
        rules = policy.rule_ids().count(),
        "compared JSON artifacts"
    );

    finish_comparison(outcome, "CHECK.DIFF_REPORT", &args.actual, args.output)
}

pub(super) fn run_lines_command(args: LinesArgs) -> Result<i32, CliError> {
    let expected = read_text_artifact(&args.expected, ArtifactRole::Golden)
        .map_err(HarnessError::from)?;
    let actual = read_text_artifact(&args.actual, ArtifactRole::Produced)
        .map_err(HarnessError::from)?;
    let collection = if args.first {
        MismatchCollection::First
    } else {
        MismatchCollection::All
    };

    let outcome = compare_lines_with(
        &split_report_lines(&expected),
        &split_report_lines(&actual),
        collection,
    );
    finish_comparison(outcome, "CHECK.TEXT_REPORT", &args.actual, args.output)
}

pub(super) fn run_normalize_path_command(args: NormalizePathArgs) -> Result<i32, CliError> {
    let normalized = normalize_path(&args.path, args.segments)
        .map_err(HarnessError::from)?;
    println!("{}", normalized);
    Ok(0)
}

fn finish_comparison(
    outcome: ComparisonOutcome,
    placeholder: &'static str,
    actual_path: &Path,
    output: Option<PathBuf>,
) -> Result<i32, CliError> {
    if let Some(output) = output {
        write_json_file(&output, &outcome)?;
    }

    match outcome.into_result(placeholder, &actual_path.display().to_string()) {
        Ok(()) => {
            println!("PASS: {}", actual_path.display());
            Ok(0)
        }
        Err(error) => {
            println!("{}", error.diagnostic_line());
            Ok(error.exit_code())
        }
    }
}
