//! Tolerant structural comparison of a tree against a reference.
//!
//! Only fields marked required take part. Numbers, including the leading
//! numeric part of strings like `"2400 MHz"`, may drift by a relative
//! tolerance; everything else must be equal. Children are matched by
//! their current name. A child present on one side only is reported
//! separately and never counts as a mismatch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use super::meta::{parse_meta, META_KEY};
use super::InfoGroup;
use crate::error::{MachineStateError, Result};

/// Default relative tolerance for numeric values.
pub const DEFAULT_TOLERANCE: f64 = 0.2;

static NUMERIC_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)(.*)$").unwrap()
});

/// What to compare a tree against.
#[derive(Debug, Clone)]
pub enum CompareTarget {
    /// An in-memory document.
    Document(Value),
    /// JSON text.
    Json(String),
    /// A file holding JSON.
    File(PathBuf),
}

impl CompareTarget {
    /// Normalize to a single document.
    pub fn into_document(self) -> Result<Value> {
        match self {
            Self::Document(value) => Ok(value),
            Self::Json(text) => Ok(serde_json::from_str(&text)?),
            Self::File(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    MachineStateError::SourceUnavailable {
                        source_id: path.display().to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(serde_json::from_str(&text)?)
            }
        }
    }
}

impl From<&InfoGroup> for CompareTarget {
    fn from(group: &InfoGroup) -> Self {
        Self::Document(group.get(true))
    }
}

impl From<Value> for CompareTarget {
    fn from(value: Value) -> Self {
        Self::Document(value)
    }
}

impl From<&Value> for CompareTarget {
    fn from(value: &Value) -> Self {
        Self::Document(value.clone())
    }
}

/// Text starting with `{` is JSON, anything else a file path.
impl From<&str> for CompareTarget {
    fn from(text: &str) -> Self {
        if text.trim_start().starts_with('{') {
            Self::Json(text.to_string())
        } else {
            Self::File(PathBuf::from(text))
        }
    }
}

impl From<String> for CompareTarget {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<&Path> for CompareTarget {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<PathBuf> for CompareTarget {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Comparison settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    /// Allowed relative difference of numeric values.
    pub tolerance: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// One differing required field. `None` means the key is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub path: String,
    pub ours: Option<Value>,
    pub theirs: Option<Value>,
}

/// Which side holds a child the other lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Ours,
    Theirs,
}

/// A child group present on one side only.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmatchedChild {
    pub path: String,
    pub side: Side,
}

/// Result of a comparison. Equality means no mismatches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub mismatches: Vec<Mismatch>,
    pub unmatched: Vec<UnmatchedChild>,
}

impl Diff {
    /// True when no required field differs.
    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Mismatches as a mapping of path to `[ours, theirs]`.
    pub fn to_value(&self) -> Value {
        let describe = |v: &Option<Value>| v.clone().unwrap_or(Value::String("<missing>".into()));
        Value::Object(
            self.mismatches
                .iter()
                .map(|m| {
                    (
                        m.path.clone(),
                        Value::Array(vec![describe(&m.ours), describe(&m.theirs)]),
                    )
                })
                .collect(),
        )
    }

    fn mismatch(&mut self, path: String, ours: Option<&Value>, theirs: Option<&Value>) {
        self.mismatches.push(Mismatch {
            path,
            ours: ours.cloned(),
            theirs: theirs.cloned(),
        });
    }
}

fn show(value: &Option<Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<missing>".to_string(),
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.mismatches {
            writeln!(f, "{}: {} != {}", m.path, show(&m.ours), show(&m.theirs))?;
        }
        for child in &self.unmatched {
            let side = match child.side {
                Side::Ours => "current state",
                Side::Theirs => "reference",
            };
            writeln!(f, "{}: only in {side}", child.path)?;
        }
        Ok(())
    }
}

impl InfoGroup {
    /// Compare against a reference with the default tolerance.
    pub fn compare(&self, other: impl Into<CompareTarget>) -> Result<Diff> {
        self.compare_with(other, &CompareOptions::default())
    }

    /// Compare against a reference.
    ///
    /// A reference written with metadata is compared strictly: a required
    /// field missing on either side is a mismatch and group kinds must
    /// agree. Without metadata only keys present on both sides count.
    pub fn compare_with(
        &self,
        other: impl Into<CompareTarget>,
        options: &CompareOptions,
    ) -> Result<Diff> {
        let document = other.into().into_document()?;
        let map = document
            .as_object()
            .ok_or_else(|| MachineStateError::InvalidArgument {
                message: "comparison target is not a JSON object".to_string(),
            })?;
        let strict = map.contains_key(META_KEY);
        let mut diff = Diff::default();
        compare_group(self, map, "", strict, options, &mut diff);
        Ok(diff)
    }

    /// Shorthand for an empty [`Diff`].
    pub fn matches(&self, other: impl Into<CompareTarget>) -> Result<bool> {
        Ok(self.compare(other)?.is_empty())
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn compare_group(
    group: &InfoGroup,
    other: &Map<String, Value>,
    path: &str,
    strict: bool,
    options: &CompareOptions,
    diff: &mut Diff,
) {
    if let Some(Value::String(theirs)) = other.get(META_KEY) {
        let their_kind = parse_meta(theirs).map(|(kind, _)| kind).ok();
        if their_kind.as_deref() != Some(group.kind()) {
            diff.mismatch(
                join(path, META_KEY),
                Some(&Value::String(group.meta())),
                Some(&Value::String(theirs.clone())),
            );
        }
    }

    for key in group.required_fields() {
        let ours = group.value(key);
        let theirs = other.get(key);
        match (ours, theirs) {
            (Some(a), Some(b)) => {
                if !values_match(a, b, options.tolerance) {
                    diff.mismatch(join(path, key), ours, theirs);
                }
            }
            (None, None) => {}
            _ if strict => diff.mismatch(join(path, key), ours, theirs),
            _ => {}
        }
    }

    for child in group.children() {
        let child_path = join(path, child.name());
        match other.get(child.name()) {
            Some(Value::Object(inner)) => {
                compare_group(child, inner, &child_path, strict, options, diff)
            }
            _ => {
                warn!(path = %child_path, "child missing in reference");
                diff.unmatched.push(UnmatchedChild {
                    path: child_path,
                    side: Side::Ours,
                });
            }
        }
    }

    for (key, value) in other {
        let is_group = match value {
            Value::Object(inner) => !strict || inner.contains_key(META_KEY),
            _ => false,
        };
        if is_group && group.child(key).is_none() && group.value(key).is_none() {
            let child_path = join(path, key);
            warn!(path = %child_path, "child missing in current state");
            diff.unmatched.push(UnmatchedChild {
                path: child_path,
                side: Side::Theirs,
            });
        }
    }
}

fn numeric_prefix(value: &Value) -> Option<(f64, &str)> {
    match value {
        Value::Number(n) => n.as_f64().map(|x| (x, "")),
        Value::String(s) => {
            let caps = NUMERIC_PREFIX_RE.captures(s)?;
            let number = caps.get(1)?.as_str().parse().ok()?;
            Some((number, caps.get(2).map_or("", |m| m.as_str())))
        }
        _ => None,
    }
}

/// Tolerant equality of two field values.
///
/// Values with a numeric prefix and identical remainder match when they
/// differ by at most `tolerance` relative to the larger magnitude.
pub fn values_match(ours: &Value, theirs: &Value, tolerance: f64) -> bool {
    if ours == theirs {
        return true;
    }
    match (numeric_prefix(ours), numeric_prefix(theirs)) {
        (Some((a, rest_a)), Some((b, rest_b))) if rest_a.trim() == rest_b.trim() => {
            let scale = a.abs().max(b.abs());
            (a - b).abs() <= tolerance * scale
        }
        _ => false,
    }
}
