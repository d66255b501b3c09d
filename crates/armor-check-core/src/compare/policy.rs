use super::path::DEFAULT_PATH_TAIL_SEGMENTS;
use crate::domain::{AST_DIFF_FIELD, HEADER_RESOLUTION_FAILURES_FIELD, HarnessError};
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Field-level comparison rules for structured artifacts.
///
/// Rules are matched against `/`-joined field paths (`astDiff/3/name`,
/// `headerResolutionFailures/0/file`) in declaration order and the first
/// matching rule wins. `*` in a field glob never crosses a `/`; use `**` for
/// whole subtrees. Fields no rule matches use the policy's default order and
/// exact scalar equality.
#[derive(Debug, Clone)]
pub struct ComparisonPolicy {
    default_order: SequenceOrder,
    path_tail_segments: usize,
    collection: MismatchCollection,
    match_strategy: MatchStrategy,
    rules: Vec<CompiledRule>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    id: String,
    order: Option<SequenceOrder>,
    path_like: bool,
    matchers: Vec<GlobMatcher>,
}

impl CompiledRule {
    fn matches(&self, field_path: &str) -> bool {
        let path = Path::new(field_path);
        self.matchers.iter().any(|matcher| matcher.is_match(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceOrder {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchCollection {
    #[default]
    All,
    /// Stop at the first divergence. Outcomes produced this way are partial.
    First,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
enum MatchStrategy {
    #[default]
    FirstMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldRule {
    pub id: String,
    #[serde(rename = "fieldGlobs", default)]
    pub field_globs: Vec<String>,
    #[serde(default)]
    pub order: Option<SequenceOrder>,
    #[serde(rename = "pathLike", default)]
    pub path_like: bool,
}

impl FieldRule {
    pub fn new<I, S>(id: impl Into<String>, field_globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            field_globs: field_globs.into_iter().map(Into::into).collect(),
            order: None,
            path_like: false,
        }
    }

    pub fn ordered(mut self) -> Self {
        self.order = Some(SequenceOrder::Ordered);
        self
    }

    pub fn unordered(mut self) -> Self {
        self.order = Some(SequenceOrder::Unordered);
        self
    }

    pub fn path_like(mut self) -> Self {
        self.path_like = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFieldRule<'a> {
    pub order: SequenceOrder,
    pub path_like: bool,
    pub rule_id: Option<&'a str>,
}

impl ComparisonPolicy {
    pub fn new(default_order: SequenceOrder) -> Self {
        Self {
            default_order,
            path_tail_segments: DEFAULT_PATH_TAIL_SEGMENTS,
            collection: MismatchCollection::All,
            match_strategy: MatchStrategy::FirstMatch,
            rules: Vec::new(),
        }
    }

    /// Plain deep equality: every sequence is ordered, no path normalization.
    pub fn strict() -> Self {
        Self::new(SequenceOrder::Ordered)
    }

    /// Deep equality ignoring sequence order at every depth.
    pub fn unordered() -> Self {
        Self::new(SequenceOrder::Unordered)
    }

    /// Built-in policy for the tool's diff-report JSON.
    ///
    /// `astDiff` entries and everything nested under them are matched as
    /// multisets, `headerResolutionFailures` records are matched as a multiset
    /// with `file` tail-normalized, and everything else is exact and ordered.
    /// That includes the lists under `parsed_status` and `unparsed_status`:
    /// goldens must list them in the order the tool writes them. A policy file
    /// with an `"order": "unordered"` rule on those fields relaxes this.
    pub fn diff_report() -> Result<Self, PolicyError> {
        Self::strict()
            .with_rule(
                FieldRule::new(
                    "header_resolution_file",
                    [format!("{}/*/file", HEADER_RESOLUTION_FAILURES_FIELD)],
                )
                .path_like(),
            )?
            .with_rule(
                FieldRule::new(
                    "header_resolution_failures",
                    [HEADER_RESOLUTION_FAILURES_FIELD.to_string()],
                )
                .unordered(),
            )?
            .with_rule(
                FieldRule::new(
                    "ast_diff",
                    [
                        AST_DIFF_FIELD.to_string(),
                        format!("{}/**", AST_DIFF_FIELD),
                    ],
                )
                .unordered(),
            )
    }

    pub fn from_policy_path(policy_path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let policy_path = policy_path.as_ref();
        let content = fs::read_to_string(policy_path).map_err(|source| PolicyError::Read {
            path: policy_path.to_path_buf(),
            source,
        })?;
        let raw: RawPolicy =
            serde_json::from_str(&content).map_err(|source| PolicyError::Parse {
                path: policy_path.to_path_buf(),
                source,
            })?;
        Self::from_raw_policy(raw)
    }

    pub fn from_policy_json(policy_json: &str) -> Result<Self, PolicyError> {
        let raw: RawPolicy =
            serde_json::from_str(policy_json).map_err(|source| PolicyError::Parse {
                path: PathBuf::from("<inline-policy>"),
                source,
            })?;
        Self::from_raw_policy(raw)
    }

    pub fn with_tail_segments(mut self, tail_segments: usize) -> Result<Self, PolicyError> {
        if tail_segments == 0 {
            return Err(PolicyError::InvalidTailSegments { value: 0 });
        }
        self.path_tail_segments = tail_segments;
        Ok(self)
    }

    pub fn with_collection(mut self, collection: MismatchCollection) -> Self {
        self.collection = collection;
        self
    }

    pub fn with_rule(mut self, rule: FieldRule) -> Result<Self, PolicyError> {
        self.rules.push(compile_rule(rule)?);
        Ok(self)
    }

    pub fn path_tail_segments(&self) -> usize {
        self.path_tail_segments
    }

    pub fn collection(&self) -> MismatchCollection {
        self.collection
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.id.as_str())
    }

    pub fn resolve_rule_for_field(&self, field_path: &str) -> ResolvedFieldRule<'_> {
        match self.match_strategy {
            MatchStrategy::FirstMatch => {
                for rule in &self.rules {
                    if rule.matches(field_path) {
                        return ResolvedFieldRule {
                            order: rule.order.unwrap_or(self.default_order),
                            path_like: rule.path_like,
                            rule_id: Some(rule.id.as_str()),
                        };
                    }
                }
            }
        }

        ResolvedFieldRule {
            order: self.default_order,
            path_like: false,
            rule_id: None,
        }
    }

    fn from_raw_policy(raw: RawPolicy) -> Result<Self, PolicyError> {
        if raw.path_tail_segments <= 0 {
            return Err(PolicyError::InvalidTailSegments {
                value: raw.path_tail_segments,
            });
        }

        let mut rules = Vec::with_capacity(raw.rules.len());
        for rule in raw.rules {
            rules.push(compile_rule(rule)?);
        }
        tracing::debug!(rule_count = rules.len(), "compiled comparison policy");

        Ok(Self {
            default_order: raw.default_order,
            path_tail_segments: raw.path_tail_segments as usize,
            collection: raw.collect,
            match_strategy: raw.match_strategy,
            rules,
        })
    }
}

fn compile_rule(rule: FieldRule) -> Result<CompiledRule, PolicyError> {
    if rule.field_globs.is_empty() {
        return Err(PolicyError::InvalidRule(format!(
            "rule '{}' does not define any fieldGlobs",
            rule.id
        )));
    }
    if rule.order.is_none() && !rule.path_like {
        return Err(PolicyError::InvalidRule(format!(
            "rule '{}' sets neither order nor pathLike",
            rule.id
        )));
    }

    let mut matchers = Vec::with_capacity(rule.field_globs.len());
    for pattern in &rule.field_globs {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| PolicyError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?
            .compile_matcher();
        matchers.push(matcher);
    }

    Ok(CompiledRule {
        id: rule.id,
        order: rule.order,
        path_like: rule.path_like,
        matchers,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read comparison policy '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse comparison policy '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("path tail segment count must be positive, got {value}")]
    InvalidTailSegments { value: i64 },
    #[error("invalid field glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },
    #[error("invalid policy rule: {0}")]
    InvalidRule(String),
}

impl From<PolicyError> for HarnessError {
    fn from(error: PolicyError) -> Self {
        let message = error.to_string();
        match error {
            PolicyError::Read { .. } => HarnessError::io_system("IO.COMPARISON_POLICY", message),
            PolicyError::Parse { .. }
            | PolicyError::InvalidTailSegments { .. }
            | PolicyError::InvalidGlob { .. }
            | PolicyError::InvalidRule(_) => {
                HarnessError::invalid_configuration("CONFIG.COMPARISON_POLICY", message)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    #[serde(rename = "defaultOrder", default = "default_order")]
    default_order: SequenceOrder,
    #[serde(rename = "pathTailSegments", default = "default_tail_segments")]
    path_tail_segments: i64,
    #[serde(default)]
    collect: MismatchCollection,
    #[serde(rename = "matchStrategy", default)]
    match_strategy: MatchStrategy,
    #[serde(default)]
    rules: Vec<FieldRule>,
}

fn default_order() -> SequenceOrder {
    SequenceOrder::Ordered
}

fn default_tail_segments() -> i64 {
    DEFAULT_PATH_TAIL_SEGMENTS as i64
}
