use super::outcome::{ComparisonOutcome, MismatchDetail, MismatchSink};
use super::policy::MismatchCollection;
use std::borrow::Cow;

/// Compares two rendered text reports line by line, collecting every
/// differing line plus a length mismatch when the line counts differ.
pub fn compare_lines<E, A>(expected: &[E], actual: &[A]) -> ComparisonOutcome
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    compare_lines_with(expected, actual, MismatchCollection::All)
}

/// Like [`compare_lines`], but with [`MismatchCollection::First`] it stops at
/// the first divergence (content or length) and flags the outcome as partial.
pub fn compare_lines_with<E, A>(
    expected: &[E],
    actual: &[A],
    collection: MismatchCollection,
) -> ComparisonOutcome
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    let mut sink = MismatchSink::new(collection);

    for (index, (expected_line, actual_line)) in expected.iter().zip(actual).enumerate() {
        if sink.is_full() {
            break;
        }
        let expected_line = expected_line.as_ref();
        let actual_line = actual_line.as_ref();
        if expected_line != actual_line {
            sink.push(MismatchDetail::line(index + 1, expected_line, actual_line));
        }
    }

    if expected.len() != actual.len() {
        sink.push(MismatchDetail::line_count(expected.len(), actual.len()));
    }

    sink.into_outcome()
}

/// Splits report text into lines that keep their terminators, so a missing
/// final newline is a visible difference.
///
/// `\r\n` and a lone `\r` both end a line and are rewritten to `\n`, so a
/// report written with Windows or classic Mac line endings compares equal to
/// the same report written with `\n`.
pub fn split_report_lines(text: &str) -> Vec<Cow<'_, str>> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(end) = rest.find(['\r', '\n']) {
        let (line, tail) = rest.split_at(end);
        if tail.starts_with('\n') {
            lines.push(Cow::Borrowed(&rest[..=end]));
            rest = &tail[1..];
        } else {
            lines.push(Cow::Owned(format!("{}\n", line)));
            rest = tail.strip_prefix("\r\n").unwrap_or(&tail[1..]);
        }
    }
    if !rest.is_empty() {
        lines.push(Cow::Borrowed(rest));
    }
    lines
}
