//! Artifact comparison engine.
//!
//! Decides whether a produced artifact is equivalent to its golden
//! counterpart: path-tail normalization, policy-driven structural comparison
//! of JSON trees, key-set pre-checks and line-by-line text comparison. All
//! functions here are pure; artifact loading lives in [`crate::harness`].

pub mod keyset;
pub mod lines;
pub mod outcome;
pub mod path;
pub mod policy;
pub mod report;
pub mod structural;

pub use keyset::validate_key_set;
pub use lines::{compare_lines, compare_lines_with, split_report_lines};
pub use outcome::{ComparisonOutcome, MismatchDetail, MismatchKind};
pub use path::{DEFAULT_PATH_TAIL_SEGMENTS, normalize_path};
pub use policy::{
    ComparisonPolicy, FieldRule, MismatchCollection, PolicyError, ResolvedFieldRule,
    SequenceOrder,
};
pub use report::{compare_diff_report, missing_report_fields};
pub use structural::compare_structured;
