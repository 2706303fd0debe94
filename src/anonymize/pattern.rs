//! Recognition of environment variables that reveal the host or user.

use std::sync::LazyLock;

use regex::Regex;

/// Built-in patterns for identifying variable names.
///
/// Each tuple contains (name, regex_pattern).
pub const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    ("user", r"^(USER|USERNAME|LOGNAME|SUDO_USER)$"),
    ("host", r"^(HOSTNAME|HOST|NAME)$"),
    ("home", r"^(HOME|MAIL|OLDPWD|PWD)$"),
    ("ssh", r"^SSH_"),
    ("display", r"^(DISPLAY|XAUTHORITY)$"),
    ("slurm_user", r"^SLURM_(JOB_USER|JOB_ACCOUNT|SUBMIT_HOST|SUBMIT_DIR|CLUSTER_NAME)$"),
];

static BUILTINS: LazyLock<Vec<IdentifyingPattern>> = LazyLock::new(|| {
    BUILTIN_PATTERNS
        .iter()
        .map(|(name, pattern)| IdentifyingPattern {
            name: name.to_string(),
            env_pattern: Regex::new(pattern).unwrap(),
        })
        .collect()
});

/// A pattern that identifies host- or user-revealing variables.
#[derive(Debug, Clone)]
pub struct IdentifyingPattern {
    /// Name of this pattern (for debugging).
    pub name: String,
    /// Regex pattern to match environment variable names.
    pub env_pattern: Regex,
}

/// Matches environment variable names against identifying patterns.
///
/// # Example
///
/// ```
/// use machinestate::anonymize::IdentifyingMatcher;
///
/// let matcher = IdentifyingMatcher::with_builtins();
/// assert!(matcher.is_identifying("USER"));
/// assert!(matcher.is_identifying("SSH_CONNECTION"));
/// assert!(!matcher.is_identifying("PATH"));
/// ```
#[derive(Debug, Clone)]
pub struct IdentifyingMatcher {
    patterns: Vec<IdentifyingPattern>,
}

impl IdentifyingMatcher {
    /// Create a matcher with built-in patterns.
    pub fn with_builtins() -> Self {
        Self {
            patterns: BUILTINS.clone(),
        }
    }

    /// Add a custom pattern.
    pub fn add_pattern(&mut self, pattern: IdentifyingPattern) {
        self.patterns.push(pattern);
    }

    /// Check if an environment variable name matches any pattern.
    pub fn is_identifying(&self, env_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.env_pattern.is_match(env_name))
    }
}

impl Default for IdentifyingMatcher {
    fn default() -> Self {
        Self::with_builtins()
    }
}
