use super::policy::MismatchCollection;
use crate::domain::{HarnessError, HarnessErrorCategory, HarnessResult};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Map key sets differ. `expected` lists keys only in expected, `actual`
    /// lists keys only in actual.
    KeySet,
    TypeChange,
    Value,
    Length,
    MissingElement,
    UnexpectedElement,
    Line,
    LineCount,
}

impl MismatchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeySet => "key_set",
            Self::TypeChange => "type_change",
            Self::Value => "value",
            Self::Length => "length",
            Self::MissingElement => "missing_element",
            Self::UnexpectedElement => "unexpected_element",
            Self::Line => "line",
            Self::LineCount => "line_count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchDetail {
    pub kind: MismatchKind,
    pub field_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub expected: Value,
    pub actual: Value,
}

impl MismatchDetail {
    pub fn new(
        kind: MismatchKind,
        field_path: impl Into<String>,
        expected: Value,
        actual: Value,
    ) -> Self {
        Self {
            kind,
            field_path: field_path.into(),
            line: None,
            expected,
            actual,
        }
    }

    pub fn key_set(
        field_path: impl Into<String>,
        only_in_expected: Vec<String>,
        only_in_actual: Vec<String>,
    ) -> Self {
        Self::new(
            MismatchKind::KeySet,
            field_path,
            Value::from(only_in_expected),
            Value::from(only_in_actual),
        )
    }

    pub fn line(line_number: usize, expected: &str, actual: &str) -> Self {
        Self {
            kind: MismatchKind::Line,
            field_path: String::new(),
            line: Some(line_number),
            expected: Value::from(expected),
            actual: Value::from(actual),
        }
    }

    pub fn line_count(expected: usize, actual: usize) -> Self {
        Self::new(
            MismatchKind::LineCount,
            String::new(),
            Value::from(expected),
            Value::from(actual),
        )
    }

    /// Keys present in expected but not in actual, for key-set mismatches.
    pub fn only_in_expected(&self) -> Vec<&str> {
        key_list(&self.expected, self.kind)
    }

    /// Keys present in actual but not in expected, for key-set mismatches.
    pub fn only_in_actual(&self) -> Vec<&str> {
        key_list(&self.actual, self.kind)
    }

    pub fn location(&self) -> String {
        if let Some(line) = self.line {
            return format!("line {}", line);
        }
        if self.field_path.is_empty() {
            "<root>".to_string()
        } else {
            self.field_path.clone()
        }
    }

    pub fn reason(&self) -> String {
        match self.kind {
            MismatchKind::KeySet => format!(
                "key sets differ: missing [{}], unexpected [{}]",
                self.only_in_expected().join(", "),
                self.only_in_actual().join(", ")
            ),
            MismatchKind::TypeChange => format!(
                "type changed from {} to {}",
                json_type_name(&self.expected),
                json_type_name(&self.actual)
            ),
            MismatchKind::Value => "value differs".to_string(),
            MismatchKind::Length => format!(
                "length differs (expected {}, actual {})",
                self.expected, self.actual
            ),
            MismatchKind::MissingElement => {
                "expected element has no equivalent in actual".to_string()
            }
            MismatchKind::UnexpectedElement => {
                "actual element has no equivalent in expected".to_string()
            }
            MismatchKind::Line => "line differs".to_string(),
            MismatchKind::LineCount => format!(
                "file length differs: expected {} lines, got {} lines",
                self.expected, self.actual
            ),
        }
    }

    fn is_top_level_key_set(&self) -> bool {
        self.kind == MismatchKind::KeySet && self.field_path.is_empty()
    }
}

impl Display for MismatchDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location(), self.reason())?;
        match self.kind {
            MismatchKind::KeySet | MismatchKind::Length | MismatchKind::LineCount => Ok(()),
            MismatchKind::MissingElement => write!(f, "\n    expected: {}", self.expected),
            MismatchKind::UnexpectedElement => write!(f, "\n    actual:   {}", self.actual),
            _ => write!(
                f,
                "\n    expected: {}\n    actual:   {}",
                self.expected, self.actual
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOutcome {
    pub matched: bool,
    pub mismatches: Vec<MismatchDetail>,
    /// Set when collection stopped at the first divergence, so `mismatches`
    /// may not be exhaustive.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stopped_early: bool,
}

impl Default for ComparisonOutcome {
    fn default() -> Self {
        Self::matched()
    }
}

impl ComparisonOutcome {
    pub fn matched() -> Self {
        Self {
            matched: true,
            mismatches: Vec::new(),
            stopped_early: false,
        }
    }

    pub fn from_mismatches(mismatches: Vec<MismatchDetail>) -> Self {
        Self {
            matched: mismatches.is_empty(),
            mismatches,
            stopped_early: false,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }

    /// `SchemaMismatch` when the top-level key sets differ, `ContentMismatch`
    /// for any other divergence, `None` on a match.
    pub fn error_category(&self) -> Option<HarnessErrorCategory> {
        if self.matched {
            return None;
        }
        if self
            .mismatches
            .iter()
            .any(MismatchDetail::is_top_level_key_set)
        {
            Some(HarnessErrorCategory::SchemaMismatch)
        } else {
            Some(HarnessErrorCategory::ContentMismatch)
        }
    }

    pub fn render(&self) -> String {
        if self.matched {
            return "match".to_string();
        }

        let mut lines = Vec::with_capacity(self.mismatches.len() + 1);
        let suffix = if self.stopped_early {
            " (stopped at first divergence)"
        } else {
            ""
        };
        lines.push(format!("{} mismatch(es){}:", self.mismatches.len(), suffix));
        for mismatch in &self.mismatches {
            lines.push(format!("  - {}", mismatch));
        }
        lines.join("\n")
    }

    /// Turns a non-matching outcome into a failure carrying the rendered diff.
    pub fn into_result(self, placeholder: &'static str, subject: &str) -> HarnessResult<()> {
        match self.error_category() {
            None => Ok(()),
            Some(category) => Err(HarnessError::new(
                category,
                placeholder,
                format!("{} mismatch\n{}", subject, self.render()),
            )),
        }
    }
}

/// Accumulates divergences, honouring the policy's collection mode.
#[derive(Debug)]
pub(crate) struct MismatchSink {
    collection: MismatchCollection,
    items: Vec<MismatchDetail>,
}

impl MismatchSink {
    pub(crate) fn new(collection: MismatchCollection) -> Self {
        Self {
            collection,
            items: Vec::new(),
        }
    }

    /// A sink that only answers "did anything diverge".
    pub(crate) fn verdict_only() -> Self {
        Self::new(MismatchCollection::First)
    }

    pub(crate) fn push(&mut self, detail: MismatchDetail) {
        if !self.is_full() {
            self.items.push(detail);
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.collection == MismatchCollection::First && !self.items.is_empty()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_outcome(self) -> ComparisonOutcome {
        let stopped_early = self.is_full();
        ComparisonOutcome {
            matched: self.items.is_empty(),
            mismatches: self.items,
            stopped_early,
        }
    }
}

fn key_list(value: &Value, kind: MismatchKind) -> Vec<&str> {
    if kind != MismatchKind::KeySet {
        return Vec::new();
    }
    value
        .as_array()
        .map(|keys| keys.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
