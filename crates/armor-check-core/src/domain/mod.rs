pub mod errors;

pub use errors::{ExitStatusMapping, HarnessError, HarnessErrorCategory, HarnessResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const AST_DIFF_FIELD: &str = "astDiff";
pub const PARSED_STATUS_FIELD: &str = "parsed_status";
pub const UNPARSED_STATUS_FIELD: &str = "unparsed_status";
pub const HEADER_RESOLUTION_FAILURES_FIELD: &str = "headerResolutionFailures";

/// Fields every diff report written by the tool carries at the top level.
pub const REQUIRED_REPORT_FIELDS: [&str; 4] = [
    AST_DIFF_FIELD,
    PARSED_STATUS_FIELD,
    UNPARSED_STATUS_FIELD,
    HEADER_RESOLUTION_FAILURES_FIELD,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    DiffReport,
    TextReport,
}

impl ArtifactKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DiffReport => "diff_report",
            Self::TextReport => "text_report",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Html,
    #[default]
    Json,
}

impl ReportFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

impl Display for ReportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
