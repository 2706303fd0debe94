//! Line-oriented value extraction with a single capture group.

use regex::Regex;

use crate::error::{MachineStateError, Result};

/// A compiled field pattern.
///
/// Holds two compilations of the same expression: one anchored at the start
/// of a line and one that may match anywhere.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    anchored: Regex,
    floating: Regex,
}

impl FieldPattern {
    /// Compile a pattern, typically with exactly one capture group.
    pub fn new(pattern: &str) -> Result<Self> {
        let invalid = |e: regex::Error| MachineStateError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        };
        let floating = Regex::new(pattern).map_err(invalid)?;
        let anchored = Regex::new(&format!("^(?:{pattern})")).map_err(invalid)?;
        Ok(Self {
            source: pattern.to_string(),
            anchored,
            floating,
        })
    }

    /// The pattern text as written by the probe.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Extract a value from `text`; see [`match_data`].
    pub fn apply(&self, text: &str) -> String {
        match_data(text, self)
    }
}

fn first_capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line).map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    })
}

/// Extract capture group 1 from multi-line `text`.
///
/// Lines are scanned twice: first for a match anchored at the line start,
/// then for a match anywhere in the line. The first hit wins. When nothing
/// matches, the whole text is returned unchanged.
///
/// # Example
///
/// ```
/// use machinestate::source::{match_data, FieldPattern};
///
/// let pattern = FieldPattern::new(r"model\s+:\s(.+)").unwrap();
/// let text = "model name\t: Xeon\nmodel\t\t: 85";
/// assert_eq!(match_data(text, &pattern), "85");
///
/// let missing = FieldPattern::new(r"stepping\s+:\s(.+)").unwrap();
/// assert_eq!(match_data(text, &missing), text);
/// ```
pub fn match_data(text: &str, pattern: &FieldPattern) -> String {
    text.lines()
        .find_map(|line| first_capture(&pattern.anchored, line))
        .or_else(|| {
            text.lines()
                .find_map(|line| first_capture(&pattern.floating, line))
        })
        .unwrap_or_else(|| text.to_string())
}
