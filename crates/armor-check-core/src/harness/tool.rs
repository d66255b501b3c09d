use super::workspace::display_path;
use crate::domain::{HarnessError, ReportFormat};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

pub const PROJECT_V1_DIR: &str = "v1";
pub const PROJECT_V2_DIR: &str = "v2";

/// Arguments for one run of the AST-diff tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub project_root_v1: PathBuf,
    pub project_root_v2: PathBuf,
    pub header: String,
    pub include_paths: Vec<String>,
    pub macro_flags: Option<String>,
    pub dump_ast_diff: bool,
    pub report_format: ReportFormat,
}

impl ToolInvocation {
    /// Invocation for a fixture directory holding `v1/` and `v2/` project roots.
    pub fn for_fixture(fixture_dir: &Path, header: impl Into<String>) -> Self {
        Self {
            project_root_v1: fixture_dir.join(PROJECT_V1_DIR),
            project_root_v2: fixture_dir.join(PROJECT_V2_DIR),
            header: header.into(),
            include_paths: Vec::new(),
            macro_flags: None,
            dump_ast_diff: true,
            report_format: ReportFormat::Json,
        }
    }

    /// `<v1> <v2> <header> [-I<path>...] [--dump-ast-diff] -r <format> [-m <flags>]`
    ///
    /// Macro flags travel as a single argument so the tool sees them exactly
    /// as written in the manifest.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![
            self.project_root_v1.clone().into_os_string(),
            self.project_root_v2.clone().into_os_string(),
            OsString::from(&self.header),
        ];
        args.extend(
            self.include_paths
                .iter()
                .map(|path| OsString::from(format!("-I{}", path))),
        );
        if self.dump_ast_diff {
            args.push(OsString::from("--dump-ast-diff"));
        }
        args.push(OsString::from("-r"));
        args.push(OsString::from(self.report_format.as_str()));
        if let Some(flags) = self.macro_flags.as_deref().filter(|flags| !flags.is_empty()) {
            args.push(OsString::from(format!("-m {}", flags)));
        }
        args
    }
}

#[derive(Debug, Clone)]
pub struct ToolRun {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the tool with `working_dir` as its working directory and waits for it.
pub fn run_tool(
    tool_path: &Path,
    working_dir: &Path,
    invocation: &ToolInvocation,
) -> Result<ToolRun, ToolError> {
    let span = tracing::info_span!(
        "tool",
        tool = %display_path(tool_path),
        cwd = %display_path(working_dir),
        header = %invocation.header
    );
    let _guard = span.enter();

    let args = invocation.args();
    tracing::debug!(?args, "invoking ast-diff tool");
    let output = Command::new(tool_path)
        .args(&args)
        .current_dir(working_dir)
        .output()
        .map_err(|source| ToolError::Spawn {
            tool: tool_path.to_path_buf(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        tracing::warn!(status = %status_text(output.status), "ast-diff tool failed");
        return Err(ToolError::ExitStatus {
            tool: tool_path.to_path_buf(),
            status: status_text(output.status),
            stderr,
        });
    }

    tracing::debug!(stdout_bytes = stdout.len(), "ast-diff tool finished");
    Ok(ToolRun { stdout, stderr })
}

pub(crate) fn status_text(status: ExitStatus) -> String {
    status.code().map_or_else(
        || "terminated by signal".to_string(),
        |code| format!("exit code {}", code),
    )
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to execute '{}': {source}", tool.display())]
    Spawn {
        tool: PathBuf,
        source: std::io::Error,
    },
    #[error("'{}' failed with {status}{}", tool.display(), stderr_suffix(stderr))]
    ExitStatus {
        tool: PathBuf,
        status: String,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", last_lines(trimmed, 5))
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines = text.lines().collect::<Vec<_>>();
    lines[lines.len().saturating_sub(count)..].join(" | ")
}

impl From<ToolError> for HarnessError {
    fn from(error: ToolError) -> Self {
        let message = error.to_string();
        match error {
            ToolError::Spawn { .. } => HarnessError::io_system("IO.TOOL_EXEC", message),
            ToolError::ExitStatus { .. } => {
                HarnessError::external_tool("TOOL.EXIT_STATUS", message)
            }
        }
    }
}
