use crate::domain::{ArtifactKind, HarnessError};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DIFF_REPORT_DIR: &str = "debug_output/ast_diffs";
pub const GOLDEN_DIFF_REPORT: &str = "expected_output.json";
pub const GOLDEN_TEXT_REPORT: &str = "expected_output.txt";
pub const PRODUCED_TEXT_REPORT: &str = "output.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    Golden,
    Produced,
}

impl ArtifactRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Golden => "golden",
            Self::Produced => "produced",
        }
    }
}

impl Display for ArtifactRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// `<fixture>/debug_output/ast_diffs/ast_diff_output_<header>.json`
pub fn produced_diff_report_path(fixture_dir: &Path, header: &str) -> PathBuf {
    fixture_dir
        .join(DIFF_REPORT_DIR)
        .join(format!("ast_diff_output_{}.json", header))
}

pub fn golden_path(fixture_dir: &Path, kind: ArtifactKind) -> PathBuf {
    match kind {
        ArtifactKind::DiffReport => fixture_dir.join(GOLDEN_DIFF_REPORT),
        ArtifactKind::TextReport => fixture_dir.join(GOLDEN_TEXT_REPORT),
    }
}

pub fn produced_path(fixture_dir: &Path, header: &str, kind: ArtifactKind) -> PathBuf {
    match kind {
        ArtifactKind::DiffReport => produced_diff_report_path(fixture_dir, header),
        ArtifactKind::TextReport => fixture_dir.join(PRODUCED_TEXT_REPORT),
    }
}

pub fn read_json_artifact(path: &Path, role: ArtifactRole) -> Result<Value, ArtifactError> {
    let content = read_artifact(path, role, ArtifactKind::DiffReport)?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        role,
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a text report verbatim. Line endings are normalized later, when the
/// text is split into lines for comparison.
pub fn read_text_artifact(path: &Path, role: ArtifactRole) -> Result<String, ArtifactError> {
    read_artifact(path, role, ArtifactKind::TextReport)
}

/// Deletes a produced artifact left over from an earlier run so a tool that
/// writes nothing cannot pass on stale output.
pub fn remove_stale_artifact(path: &Path) -> Result<bool, ArtifactError> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale artifact");
            Ok(true)
        }
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ArtifactError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_artifact(
    path: &Path,
    role: ArtifactRole,
    kind: ArtifactKind,
) -> Result<String, ArtifactError> {
    tracing::debug!(path = %path.display(), %role, %kind, "loading artifact");
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ArtifactError::Missing {
                role,
                kind,
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Read {
                role,
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{role} {kind} '{}' does not exist", path.display())]
    Missing {
        role: ArtifactRole,
        kind: ArtifactKind,
        path: PathBuf,
    },
    #[error("failed to read {role} artifact '{}': {source}", path.display())]
    Read {
        role: ArtifactRole,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {role} artifact '{}' as JSON: {source}", path.display())]
    Parse {
        role: ArtifactRole,
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to remove stale artifact '{}': {source}", path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ArtifactError> for HarnessError {
    fn from(error: ArtifactError) -> Self {
        let message = error.to_string();
        match error {
            ArtifactError::Missing {
                role: ArtifactRole::Produced,
                ..
            } => HarnessError::external_tool("TOOL.MISSING_ARTIFACT", message),
            ArtifactError::Parse {
                role: ArtifactRole::Produced,
                ..
            } => HarnessError::external_tool("TOOL.MALFORMED_ARTIFACT", message),
            ArtifactError::Missing {
                role: ArtifactRole::Golden,
                ..
            } => HarnessError::invalid_configuration("CONFIG.MISSING_GOLDEN", message),
            ArtifactError::Parse {
                role: ArtifactRole::Golden,
                ..
            } => HarnessError::invalid_configuration("CONFIG.MALFORMED_GOLDEN", message),
            ArtifactError::Read { .. } | ArtifactError::Remove { .. } => {
                HarnessError::io_system("IO.ARTIFACT", message)
            }
        }
    }
}
