use super::keyset::key_set_difference;
use super::outcome::{ComparisonOutcome, MismatchDetail, MismatchKind, MismatchSink};
use super::path::path_tail;
use super::policy::{ComparisonPolicy, SequenceOrder};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::mem::discriminant;

/// Decides whether two JSON trees are equivalent under `policy`.
///
/// Every divergence is reported with its field path unless the policy asks
/// to stop at the first one.
pub fn compare_structured(
    expected: &Value,
    actual: &Value,
    policy: &ComparisonPolicy,
) -> ComparisonOutcome {
    let mut sink = MismatchSink::new(policy.collection());
    StructuralComparator { policy }.compare("", expected, actual, &mut sink);
    sink.into_outcome()
}

struct StructuralComparator<'p> {
    policy: &'p ComparisonPolicy,
}

impl StructuralComparator<'_> {
    fn compare(&self, path: &str, expected: &Value, actual: &Value, sink: &mut MismatchSink) {
        if sink.is_full() {
            return;
        }

        match (expected, actual) {
            (Value::Object(expected), Value::Object(actual)) => {
                self.compare_maps(path, expected, actual, sink)
            }
            (Value::Array(expected), Value::Array(actual)) => {
                match self.policy.resolve_rule_for_field(path).order {
                    SequenceOrder::Ordered => self.compare_ordered(path, expected, actual, sink),
                    SequenceOrder::Unordered => {
                        self.compare_unordered(path, expected, actual, sink)
                    }
                }
            }
            _ => self.compare_scalars(path, expected, actual, sink),
        }
    }

    fn compare_maps(
        &self,
        path: &str,
        expected: &Map<String, Value>,
        actual: &Map<String, Value>,
        sink: &mut MismatchSink,
    ) {
        if let Some(detail) = key_set_difference(path, expected, actual) {
            sink.push(detail);
        }

        for (key, expected_value) in expected {
            if let Some(actual_value) = actual.get(key) {
                let child = child_path(path, key);
                self.compare(&child, expected_value, actual_value, sink);
            }
        }
    }

    fn compare_ordered(
        &self,
        path: &str,
        expected: &[Value],
        actual: &[Value],
        sink: &mut MismatchSink,
    ) {
        if expected.len() != actual.len() {
            sink.push(MismatchDetail::new(
                MismatchKind::Length,
                path,
                Value::from(expected.len()),
                Value::from(actual.len()),
            ));
        }

        for (index, (expected_item, actual_item)) in expected.iter().zip(actual).enumerate() {
            let child = child_path(path, &index.to_string());
            self.compare(&child, expected_item, actual_item, sink);
        }

        let common = expected.len().min(actual.len());
        for (index, item) in expected.iter().enumerate().skip(common) {
            sink.push(MismatchDetail::new(
                MismatchKind::MissingElement,
                child_path(path, &index.to_string()),
                item.clone(),
                Value::Null,
            ));
        }
        for (index, item) in actual.iter().enumerate().skip(common) {
            sink.push(MismatchDetail::new(
                MismatchKind::UnexpectedElement,
                child_path(path, &index.to_string()),
                Value::Null,
                item.clone(),
            ));
        }
    }

    /// Multiset comparison: finds a maximum pairing of equivalent elements and
    /// reports whatever is left on either side.
    ///
    /// Exactly equal elements are paired first through a bucket keyed on their
    /// serialized form. Only the remainder goes through pairwise equivalence
    /// checks and augmenting-path matching.
    fn compare_unordered(
        &self,
        path: &str,
        expected: &[Value],
        actual: &[Value],
        sink: &mut MismatchSink,
    ) {
        let mut partner_of_actual: Vec<Option<usize>> = vec![None; actual.len()];
        let mut expected_matched = vec![false; expected.len()];

        let mut exact_buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for (actual_index, item) in actual.iter().enumerate().rev() {
            exact_buckets
                .entry(canonical_key(item))
                .or_default()
                .push(actual_index);
        }
        for (expected_index, item) in expected.iter().enumerate() {
            let paired = exact_buckets
                .get_mut(&canonical_key(item))
                .and_then(Vec::pop);
            if let Some(actual_index) = paired {
                partner_of_actual[actual_index] = Some(expected_index);
                expected_matched[expected_index] = true;
            }
        }

        let free_actual = (0..actual.len())
            .filter(|&index| partner_of_actual[index].is_none())
            .collect::<Vec<_>>();
        let leftover_expected = (0..expected.len())
            .filter(|&index| !expected_matched[index])
            .collect::<Vec<_>>();

        if !leftover_expected.is_empty() && !free_actual.is_empty() {
            // Equivalence here is equality of normalized forms, so an element
            // paired above by exact equality never blocks a better pairing.
            let mut candidates: Vec<Vec<usize>> = vec![Vec::new(); expected.len()];
            for &expected_index in &leftover_expected {
                let child = child_path(path, &expected_index.to_string());
                candidates[expected_index] = free_actual
                    .iter()
                    .copied()
                    .filter(|&actual_index| {
                        self.equivalent(&child, &expected[expected_index], &actual[actual_index])
                    })
                    .collect();
            }

            for &expected_index in &leftover_expected {
                let mut visited = vec![false; actual.len()];
                if augment(
                    expected_index,
                    &candidates,
                    &mut visited,
                    &mut partner_of_actual,
                ) {
                    expected_matched[expected_index] = true;
                }
            }
        }

        // Augmenting paths can re-route earlier pairs but never unmatch an
        // expected element, so the flags above stay accurate.
        if expected.len() != actual.len() {
            sink.push(MismatchDetail::new(
                MismatchKind::Length,
                path,
                Value::from(expected.len()),
                Value::from(actual.len()),
            ));
        }
        for (index, item) in expected.iter().enumerate() {
            if !expected_matched[index] {
                sink.push(MismatchDetail::new(
                    MismatchKind::MissingElement,
                    child_path(path, &index.to_string()),
                    item.clone(),
                    Value::Null,
                ));
            }
        }
        for (index, item) in actual.iter().enumerate() {
            if partner_of_actual[index].is_none() {
                sink.push(MismatchDetail::new(
                    MismatchKind::UnexpectedElement,
                    child_path(path, &index.to_string()),
                    Value::Null,
                    item.clone(),
                ));
            }
        }
    }

    fn compare_scalars(
        &self,
        path: &str,
        expected: &Value,
        actual: &Value,
        sink: &mut MismatchSink,
    ) {
        if discriminant(expected) != discriminant(actual) {
            sink.push(MismatchDetail::new(
                MismatchKind::TypeChange,
                path,
                expected.clone(),
                actual.clone(),
            ));
            return;
        }

        let equal = match (expected, actual) {
            (Value::String(expected_text), Value::String(actual_text)) => {
                let rule = self.policy.resolve_rule_for_field(path);
                if rule.path_like {
                    let tail = self.policy.path_tail_segments();
                    path_tail(expected_text, tail) == path_tail(actual_text, tail)
                } else {
                    expected_text == actual_text
                }
            }
            _ => expected == actual,
        };

        if !equal {
            sink.push(MismatchDetail::new(
                MismatchKind::Value,
                path,
                expected.clone(),
                actual.clone(),
            ));
        }
    }

    fn equivalent(&self, path: &str, expected: &Value, actual: &Value) -> bool {
        if expected == actual {
            return true;
        }
        if discriminant(expected) != discriminant(actual) {
            return false;
        }
        let mut verdict = MismatchSink::verdict_only();
        self.compare(path, expected, actual, &mut verdict);
        verdict.is_empty()
    }
}

fn augment(
    expected_index: usize,
    candidates: &[Vec<usize>],
    visited: &mut [bool],
    partner_of_actual: &mut [Option<usize>],
) -> bool {
    let candidates_here = &candidates[expected_index];
    if let Some(&actual_index) = candidates_here
        .iter()
        .find(|&&actual_index| !visited[actual_index] && partner_of_actual[actual_index].is_none())
    {
        visited[actual_index] = true;
        partner_of_actual[actual_index] = Some(expected_index);
        return true;
    }

    for &actual_index in candidates_here {
        if visited[actual_index] {
            continue;
        }
        visited[actual_index] = true;

        let Some(other) = partner_of_actual[actual_index] else {
            continue;
        };
        if augment(other, candidates, visited, partner_of_actual) {
            partner_of_actual[actual_index] = Some(expected_index);
            return true;
        }
    }
    false
}

/// Serialized form used to bucket exactly equal elements. Object keys come
/// out sorted because `serde_json::Map` is ordered by key.
fn canonical_key(value: &Value) -> String {
    value.to_string()
}

fn child_path(parent: &str, key: &str) -> String {
    let key = escape_field_key(key);
    if parent.is_empty() {
        key.into_owned()
    } else {
        format!("{}/{}", parent, key)
    }
}

/// JSON-pointer escaping so keys containing `/` keep field paths unambiguous.
fn escape_field_key(key: &str) -> Cow<'_, str> {
    if key.contains(['~', '/']) {
        Cow::Owned(key.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(key)
    }
}

#[cfg(test)]
mod tests {
    use super::compare_structured;
    use crate::compare::outcome::MismatchKind;
    use crate::compare::policy::{ComparisonPolicy, FieldRule, MismatchCollection};
    use serde_json::{Value, json};
    use std::time::{Duration, Instant};

    fn diff_report_policy() -> ComparisonPolicy {
        ComparisonPolicy::diff_report().expect("built-in policy should compile")
    }

    fn permutations(items: &[Value]) -> Vec<Vec<Value>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut result = Vec::new();
        for index in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(index);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                result.push(tail);
            }
        }
        result
    }

    #[test]
    fn unordered_comparison_is_permutation_invariant() {
        let items = vec![
            json!({ "kind": "FunctionDecl", "name": "init", "tag": "modified" }),
            json!({ "kind": "FieldDecl", "name": "count", "tag": "added" }),
            json!({ "kind": "FieldDecl", "name": "count", "tag": "added" }),
            json!("plain"),
        ];
        let expected = Value::Array(items.clone());
        let policy = ComparisonPolicy::unordered();

        for permutation in permutations(&items) {
            let outcome = compare_structured(&expected, &Value::Array(permutation), &policy);
            assert!(outcome.is_match(), "{}", outcome.render());
        }
    }

    #[test]
    fn ordered_comparison_rejects_nontrivial_permutations() {
        let items = vec![json!("a"), json!("b"), json!("c")];
        let expected = Value::Array(items.clone());
        let policy = ComparisonPolicy::strict();

        for permutation in permutations(&items) {
            let is_identity = permutation == items;
            let outcome = compare_structured(&expected, &Value::Array(permutation), &policy);
            assert_eq!(outcome.is_match(), is_identity);
        }
    }

    #[test]
    fn ast_diff_swap_matches_only_when_unordered() {
        let a = json!({ "name": "Point", "tag": "modified", "children": [{ "name": "x" }] });
        let b = json!({ "name": "legacy_init", "tag": "removed" });
        let expected = json!({ "astDiff": [a.clone(), b.clone()] });
        let actual = json!({ "astDiff": [b, a] });

        assert!(compare_structured(&expected, &actual, &diff_report_policy()).is_match());

        let outcome = compare_structured(&expected, &actual, &ComparisonPolicy::strict());
        assert!(!outcome.is_match());
        assert!(
            outcome
                .mismatches
                .iter()
                .all(|mismatch| mismatch.field_path.starts_with("astDiff/"))
        );
    }

    #[test]
    fn multiset_matching_respects_duplicates() {
        let expected = json!(["x", "x", "y"]);
        let actual = json!(["x", "y", "y"]);
        let outcome = compare_structured(&expected, &actual, &ComparisonPolicy::unordered());

        assert!(!outcome.is_match());
        let kinds = outcome
            .mismatches
            .iter()
            .map(|mismatch| (mismatch.kind, mismatch.field_path.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                (MismatchKind::MissingElement, "1"),
                (MismatchKind::UnexpectedElement, "2"),
            ]
        );
    }

    #[test]
    fn header_resolution_failures_normalize_file_tails() {
        let expected = json!({
            "headerResolutionFailures": [
                {
                    "file": "/home/a/work/armor/src/tests/alpha/functional/fatal_errors/v2/mylib.h",
                    "header": "types.h"
                },
                {
                    "file": "/home/a/work/armor/src/tests/alpha/functional/fatal_errors/v1/mylib.h",
                    "header": "missing.h"
                }
            ]
        });
        let actual = json!({
            "headerResolutionFailures": [
                {
                    "file": "/ci/build/x/src/tests/alpha/functional/fatal_errors/v1/mylib.h",
                    "header": "missing.h"
                },
                {
                    "file": "/ci/build/x/src/tests/alpha/functional/fatal_errors/v2/mylib.h",
                    "header": "types.h"
                }
            ]
        });

        let outcome = compare_structured(&expected, &actual, &diff_report_policy());
        assert!(outcome.is_match(), "{}", outcome.render());
    }

    #[test]
    fn header_field_stays_exact_while_file_is_normalized() {
        let expected = json!({
            "headerResolutionFailures": [
                { "file": "/home/a/proj/src/x/y/h.h", "header": "z.h" }
            ]
        });
        let renamed = json!({
            "headerResolutionFailures": [
                { "file": "/ci/build/proj/src/x/y/h.h", "header": "Z.h" }
            ]
        });

        let policy = ComparisonPolicy::diff_report()
            .and_then(|policy| policy.with_tail_segments(5))
            .expect("policy should build");
        let same_header = json!({
            "headerResolutionFailures": [
                { "file": "/ci/build/proj/src/x/y/h.h", "header": "z.h" }
            ]
        });
        assert!(compare_structured(&expected, &same_header, &policy).is_match());

        let outcome = compare_structured(&expected, &renamed, &policy);
        assert!(!outcome.is_match());
        assert!(
            outcome
                .mismatches
                .iter()
                .any(|mismatch| mismatch.kind == MismatchKind::MissingElement)
        );
    }

    #[test]
    fn raw_paths_differ_without_path_rule() {
        let expected = json!({ "file": "/home/a/proj/src/x/y/z/w/h.h" });
        let actual = json!({ "file": "/ci/build/proj/src/x/y/z/w/h.h" });

        let strict = compare_structured(&expected, &actual, &ComparisonPolicy::strict());
        assert_eq!(strict.mismatches.len(), 1);
        assert_eq!(strict.mismatches[0].kind, MismatchKind::Value);
        assert_eq!(strict.mismatches[0].field_path, "file");

        let policy = ComparisonPolicy::strict()
            .with_rule(FieldRule::new("file", ["file"]).path_like())
            .expect("rule should compile");
        assert!(compare_structured(&expected, &actual, &policy).is_match());
    }

    #[test]
    fn collects_every_divergence_with_field_paths() {
        let expected = json!({
            "parsed_status": { "mylib.h": "parsed" },
            "unparsed_status": { "mylib.h": [] },
            "nested": { "a/b": 1, "flag": true },
            "count": 3
        });
        let actual = json!({
            "parsed_status": { "mylib.h": "failed" },
            "unparsed_status": { "mylib.h": [], "extra.h": [] },
            "nested": { "a/b": 2, "flag": "true" },
            "count": 3
        });

        let outcome = compare_structured(&expected, &actual, &ComparisonPolicy::strict());
        let found = outcome
            .mismatches
            .iter()
            .map(|mismatch| (mismatch.kind, mismatch.field_path.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            found,
            vec![
                (MismatchKind::Value, "nested/a~1b"),
                (MismatchKind::TypeChange, "nested/flag"),
                (MismatchKind::Value, "parsed_status/mylib.h"),
                (MismatchKind::KeySet, "unparsed_status"),
            ]
        );
        assert!(!outcome.stopped_early);
    }

    #[test]
    fn first_collection_stops_after_one_divergence() {
        let policy = ComparisonPolicy::strict().with_collection(MismatchCollection::First);
        let outcome = compare_structured(&json!([1, 2, 3]), &json!([9, 8, 7]), &policy);

        assert_eq!(outcome.mismatches.len(), 1);
        assert_eq!(outcome.mismatches[0].field_path, "0");
        assert!(outcome.stopped_early);
    }

    #[test]
    fn ordered_length_difference_reports_trailing_elements() {
        let outcome = compare_structured(
            &json!({ "lines": ["a", "b"] }),
            &json!({ "lines": ["a", "b", "c"] }),
            &ComparisonPolicy::strict(),
        );

        let found = outcome
            .mismatches
            .iter()
            .map(|mismatch| (mismatch.kind, mismatch.field_path.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            found,
            vec![
                (MismatchKind::Length, "lines"),
                (MismatchKind::UnexpectedElement, "lines/2"),
            ]
        );
    }

    #[test]
    fn integers_and_floats_are_not_conflated() {
        let outcome = compare_structured(
            &json!({ "n": 1 }),
            &json!({ "n": 1.0 }),
            &ComparisonPolicy::strict(),
        );
        assert!(!outcome.is_match());
        assert_eq!(outcome.mismatches[0].kind, MismatchKind::Value);
    }

    fn ast_diff_entries(count: usize) -> Vec<Value> {
        (0..count)
            .map(|index| {
                json!({
                    "name": format!("symbol_{}", index),
                    "tag": "modified",
                    "children": [
                        { "name": format!("field_{}_a", index) },
                        { "name": format!("field_{}_b", index) }
                    ]
                })
            })
            .collect()
    }

    #[test]
    fn large_reversed_ast_diff_matches_quickly() {
        let entries = ast_diff_entries(1000);
        let mut reversed = entries.clone();
        reversed.reverse();
        let expected = json!({ "astDiff": entries });
        let actual = json!({ "astDiff": reversed });

        let started = Instant::now();
        let outcome = compare_structured(&expected, &actual, &diff_report_policy());
        assert!(outcome.is_match(), "{}", outcome.render());
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "comparison took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn large_ast_diff_reports_the_one_changed_entry() {
        let entries = ast_diff_entries(1000);
        let mut changed = entries.clone();
        changed.reverse();
        changed[10]["tag"] = json!("removed");
        let expected = json!({ "astDiff": entries });
        let actual = json!({ "astDiff": changed });

        let outcome = compare_structured(&expected, &actual, &diff_report_policy());
        let found = outcome
            .mismatches
            .iter()
            .map(|mismatch| (mismatch.kind, mismatch.field_path.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            found,
            vec![
                (MismatchKind::MissingElement, "astDiff/989"),
                (MismatchKind::UnexpectedElement, "astDiff/10"),
            ]
        );
    }

    #[test]
    fn near_equal_elements_still_pair_through_normalization() {
        let tail = "src/tests/alpha/functional/fatal_errors/v1/mylib.h";
        let home = format!("/home/a/work/armor/{}", tail);
        let ci = format!("/ci/build/x/{}", tail);
        let opt = format!("/opt/other/{}", tail);
        let expected = json!({
            "headerResolutionFailures": [
                { "file": home, "header": "a.h" },
                { "file": ci, "header": "a.h" }
            ]
        });
        let actual = json!({
            "headerResolutionFailures": [
                { "file": ci, "header": "a.h" },
                { "file": opt, "header": "a.h" }
            ]
        });

        let outcome = compare_structured(&expected, &actual, &diff_report_policy());
        assert!(outcome.is_match(), "{}", outcome.render());
    }
}
