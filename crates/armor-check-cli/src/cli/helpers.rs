use super::CliError;
use anyhow::Context;
use armor_check_core::compare::ComparisonPolicy;
use armor_check_core::domain::HarnessError;
use armor_check_core::harness::workspace::{find_marker_upward, resolve_against};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub(super) const BUILD_DIR_MARKER: &str = "build";
pub(super) const TOOL_PATH_IN_BUILD_DIR: &str = "src/tests/armor/src/armor_debug";

pub(super) fn current_working_dir() -> Result<PathBuf, CliError> {
    std::env::current_dir().map_err(|source| {
        CliError::Harness(HarnessError::io_system(
            "IO.CLI_CURRENT_DIR",
            format!("failed to read current working directory: {}", source),
        ))
    })
}

pub(super) fn resolve_cli_path(working_dir: &Path, path: &Path) -> PathBuf {
    resolve_against(working_dir, path)
}

pub(super) fn discover_tool_path(working_dir: &Path) -> Result<PathBuf, CliError> {
    let build_dir = find_marker_upward(working_dir, BUILD_DIR_MARKER).ok_or_else(|| {
        CliError::Harness(HarnessError::invalid_configuration(
            "CONFIG.CLI_PROJECT_ROOT",
            format!(
                "failed to locate a '{}' directory above '{}'; pass --tool explicitly",
                BUILD_DIR_MARKER,
                working_dir.display()
            ),
        ))
    })?;
    let tool_path = build_dir.join(TOOL_PATH_IN_BUILD_DIR);
    tracing::debug!(tool = %tool_path.display(), "discovered ast-diff tool");
    Ok(tool_path)
}

pub(super) fn load_policy(
    policy_path: Option<&Path>,
    strict: bool,
) -> Result<ComparisonPolicy, CliError> {
    let policy = match policy_path {
        Some(path) => ComparisonPolicy::from_policy_path(path).map_err(HarnessError::from)?,
        None if strict => ComparisonPolicy::strict(),
        None => ComparisonPolicy::diff_report().map_err(HarnessError::from)?,
    };
    Ok(policy)
}

pub(super) fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize outcome for '{}'", path.display()))?;
    fs::write(path, content)
        .with_context(|| format!("failed to write outcome '{}'", path.display()))?;
    Ok(())
}
