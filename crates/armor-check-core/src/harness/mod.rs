//! Test orchestration around the comparison engine: runs the AST-diff tool
//! per fixture case, loads golden and produced artifacts, and aggregates
//! verdicts into a regression report.

pub mod artifacts;
pub mod case;
pub mod manifest;
pub mod regression;
pub mod suite;
pub mod tool;
pub mod workspace;

pub use case::{CaseReport, CheckReport, FailureRecord, run_case};
pub use manifest::{FixtureCase, FixtureManifest, ManifestError, OpaqueSuite};
pub use regression::{
    RegressionRunReport, RegressionRunnerConfig, RegressionRunnerError, render_human_summary,
    run_regression,
};
pub use tool::{ToolError, ToolInvocation, run_tool};
