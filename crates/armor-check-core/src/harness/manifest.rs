use crate::domain::{HarnessError, ReportFormat};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HEADER: &str = "mylib.h";

/// Fixture cases and opaque suites the regression runner executes.
///
/// Relative `directory`, `policy` and `executable` paths are resolved by the
/// runner: fixture directories and suite executables against the fixtures
/// root, policy files against the manifest's own directory.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureManifest {
    #[serde(rename = "defaultPolicy", default)]
    pub default_policy: Option<PathBuf>,
    #[serde(default)]
    pub cases: Vec<FixtureCase>,
    #[serde(default)]
    pub suites: Vec<OpaqueSuite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureCase {
    pub id: String,
    pub directory: PathBuf,
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(rename = "includePaths", default)]
    pub include_paths: Vec<String>,
    #[serde(rename = "macroFlags", default)]
    pub macro_flags: Option<String>,
    #[serde(rename = "reportFormat", default)]
    pub report_format: ReportFormat,
    #[serde(rename = "dumpAstDiff", default = "default_true")]
    pub dump_ast_diff: bool,
    #[serde(rename = "compareTextReport", default)]
    pub compare_text_report: bool,
    #[serde(default)]
    pub policy: Option<PathBuf>,
}

/// An externally built test executable judged only by its exit status.
#[derive(Debug, Clone, Deserialize)]
pub struct OpaqueSuite {
    pub id: String,
    pub executable: PathBuf,
}

impl FixtureManifest {
    pub fn from_path(manifest_path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(manifest_path).map_err(|source| ManifestError::Read {
            path: manifest_path.to_path_buf(),
            source,
        })?;
        let manifest: Self =
            serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
                path: manifest_path.to_path_buf(),
                source,
            })?;
        manifest.validate()?;
        tracing::debug!(
            cases = manifest.cases.len(),
            suites = manifest.suites.len(),
            "loaded fixture manifest"
        );
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = BTreeSet::new();
        let ids = self
            .cases
            .iter()
            .map(|case| case.id.as_str())
            .chain(self.suites.iter().map(|suite| suite.id.as_str()));
        for id in ids {
            if id.trim().is_empty() {
                return Err(ManifestError::Invalid(
                    "case and suite ids must not be empty".to_string(),
                ));
            }
            if !seen.insert(id) {
                return Err(ManifestError::Invalid(format!("duplicate id '{}'", id)));
            }
        }

        for case in &self.cases {
            if case.header.trim().is_empty() {
                return Err(ManifestError::Invalid(format!(
                    "case '{}' has an empty header",
                    case.id
                )));
            }
            if !case.dump_ast_diff && !case.compare_text_report {
                return Err(ManifestError::Invalid(format!(
                    "case '{}' disables both the diff report and the text report",
                    case.id
                )));
            }
        }
        Ok(())
    }
}

fn default_header() -> String {
    DEFAULT_HEADER.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse manifest '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

impl From<ManifestError> for HarnessError {
    fn from(error: ManifestError) -> Self {
        let message = error.to_string();
        match error {
            ManifestError::Read { .. } => HarnessError::io_system("IO.FIXTURE_MANIFEST", message),
            ManifestError::Parse { .. } | ManifestError::Invalid(_) => {
                HarnessError::invalid_configuration("CONFIG.FIXTURE_MANIFEST", message)
            }
        }
    }
}
