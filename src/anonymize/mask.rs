//! Replacement of host-identifying values.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Placeholder stored instead of an identifying value.
pub const PLACEHOLDER: &str = "[ANONYMIZED]";

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b").unwrap()
});

// Full and compressed forms, at least two groups and one "::" or seven ":".
static IPV6_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:[0-9a-f]{1,4}:){7}[0-9a-f]{1,4}\b|\b(?:[0-9a-f]{1,4}:){1,7}:(?:[0-9a-f]{1,4}(?::[0-9a-f]{1,4}){0,6}\b)?|::[0-9a-f]{1,4}(?::[0-9a-f]{1,4}){0,6}\b",
    )
    .unwrap()
});

/// Replace IPv4 and IPv6 shaped substrings with the placeholder.
///
/// # Example
///
/// ```
/// use machinestate::anonymize::scrub_addresses;
///
/// assert_eq!(
///     scrub_addresses("inet 10.0.0.7/24 brd 10.0.0.255"),
///     "inet [ANONYMIZED]/24 brd [ANONYMIZED]"
/// );
/// ```
pub fn scrub_addresses(text: &str) -> String {
    let text = IPV4_RE.replace_all(text, PLACEHOLDER);
    IPV6_RE.replace_all(&text, PLACEHOLDER).into_owned()
}

/// Anonymize one field value.
///
/// Strings and numbers become the placeholder, lists are anonymized
/// element-wise, null stays null so "no value" remains visible.
pub fn anonymize_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Array(items) => Value::Array(items.iter().map(anonymize_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), anonymize_value(v)))
                .collect(),
        ),
        _ => Value::String(PLACEHOLDER.to_string()),
    }
}

/// Masks known identifying strings inside free text.
///
/// # Example
///
/// ```
/// use machinestate::anonymize::Anonymizer;
///
/// let mut anonymizer = Anonymizer::new();
/// anonymizer.add_secret("alice");
///
/// let output = anonymizer.mask("/home/alice/bin:/usr/bin");
/// assert_eq!(output, "/home/[ANONYMIZED]/bin:/usr/bin");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Anonymizer {
    secrets: Vec<String>,
}

impl Anonymizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value to be masked. Empty strings are ignored.
    pub fn add_secret(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() && !self.secrets.contains(&value) {
            self.secrets.push(value);
            // Longest first, so "alice-laptop" wins over "alice".
            self.secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        }
    }

    /// Register multiple values.
    pub fn add_secrets(&mut self, values: impl IntoIterator<Item = impl Into<String>>) {
        for value in values {
            self.add_secret(value);
        }
    }

    /// Mask registered values and network addresses in `input`.
    pub fn mask(&self, input: &str) -> String {
        let mut result = input.to_string();
        for secret in &self.secrets {
            result = result.replace(secret.as_str(), PLACEHOLDER);
        }
        scrub_addresses(&result)
    }

    /// Number of registered values.
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }
}
