use super::keyset::validate_key_set;
use super::outcome::{ComparisonOutcome, MismatchDetail, MismatchKind};
use super::policy::ComparisonPolicy;
use super::structural::compare_structured;
use crate::domain::REQUIRED_REPORT_FIELDS;
use serde_json::Value;

/// Compares a golden diff report with a produced one.
///
/// The top-level key sets are checked first; when they differ the schema
/// mismatch is returned on its own and the structural pass is skipped.
pub fn compare_diff_report(
    expected: &Value,
    actual: &Value,
    policy: &ComparisonPolicy,
) -> ComparisonOutcome {
    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            let key_set = validate_key_set(expected_map, actual_map);
            if !key_set.is_match() {
                return key_set;
            }
        }
        _ => {
            return ComparisonOutcome::from_mismatches(vec![MismatchDetail::new(
                MismatchKind::TypeChange,
                "",
                expected.clone(),
                actual.clone(),
            )]);
        }
    }

    compare_structured(expected, actual, policy)
}

/// Required diff-report fields absent from `report`.
pub fn missing_report_fields(report: &Value) -> Vec<&'static str> {
    let Some(fields) = report.as_object() else {
        return REQUIRED_REPORT_FIELDS.to_vec();
    };
    REQUIRED_REPORT_FIELDS
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect()
}
