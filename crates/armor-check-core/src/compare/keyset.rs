use super::outcome::{ComparisonOutcome, MismatchDetail};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Checks that two maps carry exactly the same keys.
///
/// On a difference the single mismatch lists every key missing from `actual`
/// and every key `actual` adds, so whole absent or unexpected sections show
/// up at once.
pub fn validate_key_set(
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
) -> ComparisonOutcome {
    match key_set_difference("", expected, actual) {
        Some(detail) => ComparisonOutcome::from_mismatches(vec![detail]),
        None => ComparisonOutcome::matched(),
    }
}

pub(crate) fn key_set_difference(
    field_path: &str,
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
) -> Option<MismatchDetail> {
    let expected_keys = expected.keys().map(String::as_str).collect::<BTreeSet<_>>();
    let actual_keys = actual.keys().map(String::as_str).collect::<BTreeSet<_>>();
    if expected_keys == actual_keys {
        return None;
    }

    let only_in_expected = expected_keys
        .difference(&actual_keys)
        .map(|key| key.to_string())
        .collect();
    let only_in_actual = actual_keys
        .difference(&expected_keys)
        .map(|key| key.to_string())
        .collect();
    Some(MismatchDetail::key_set(
        field_path,
        only_in_expected,
        only_in_actual,
    ))
}
