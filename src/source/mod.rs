//! Value sources: the atomic acquisition primitives.
//!
//! A [`Field`] binds a name to a [`ValueSource`] plus an optional
//! [`FieldPattern`] and [`Converter`](crate::parse::Converter). Resolution
//! happens in two steps: the raw text is fetched once per [`SourceKey`]
//! through a [`SourceBackend`], then every field sharing that key refines
//! the text independently.

pub mod backend;
pub mod cache;
pub mod command;
pub mod path;
pub mod pattern;

pub use backend::{MockBackend, SourceBackend, SystemBackend};
pub use cache::SourceCache;
pub use command::{execute, execute_captured, CommandOptions, CommandResult};
pub use path::{is_executable, resolve_tool_path, which};
pub use pattern::{match_data, FieldPattern};

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::parse::Converter;

/// Where a field's raw value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// A fixed value, stored as is.
    Constant(Value),
    /// Contents of a regular file.
    File(PathBuf),
    /// Stdout of an executable found on PATH.
    Command { executable: String, args: String },
}

impl ValueSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn command(executable: impl Into<String>, args: impl Into<String>) -> Self {
        Self::Command {
            executable: executable.into(),
            args: args.into(),
        }
    }

    /// Fetch the raw text of a file or command source.
    ///
    /// Constants have no raw text and resolve to their value elsewhere.
    pub fn fetch(&self, backend: &dyn SourceBackend) -> Result<Option<String>> {
        match self {
            Self::Constant(_) => Ok(None),
            Self::File(path) => backend.read_file(path).map(Some),
            Self::Command { executable, args } => backend.run_command(executable, args).map(Some),
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "constant {value}"),
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Command { executable, args } if args.is_empty() => {
                write!(f, "command {executable}")
            }
            Self::Command { executable, args } => write!(f, "command {executable} {args}"),
        }
    }
}

/// Deduplication identity of a source within one update pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    /// Constants never share a key; the field index keeps them apart.
    Constant(usize),
    File(PathBuf),
    Command(String, String),
}

/// One named, declared value of a group.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub source: ValueSource,
    pub pattern: Option<FieldPattern>,
    pub converter: Option<Converter>,
    /// Load-bearing for comparison.
    pub required: bool,
    /// Scrubbed when the owning group is anonymous.
    pub identifying: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, source: ValueSource) -> Self {
        Self {
            name: name.into(),
            source,
            pattern: None,
            converter: None,
            required: false,
            identifying: false,
        }
    }

    /// Identity of this field's source; `index` is the field's position in
    /// its group.
    pub fn key(&self, index: usize) -> SourceKey {
        match &self.source {
            ValueSource::Constant(_) => SourceKey::Constant(index),
            ValueSource::File(path) => SourceKey::File(path.clone()),
            ValueSource::Command { executable, args } => {
                SourceKey::Command(executable.clone(), args.clone())
            }
        }
    }

    /// Apply pattern and converter to already fetched raw text.
    ///
    /// A failing converter keeps the matched text as a string.
    pub fn refine(&self, raw: &str) -> Value {
        let matched = match &self.pattern {
            Some(pattern) => pattern.apply(raw),
            None => raw.to_string(),
        };
        match self.converter {
            Some(convert) => convert(&matched).unwrap_or_else(|e| {
                debug!(field = %self.name, error = %e, "conversion failed, keeping text");
                Value::String(matched)
            }),
            None => Value::String(matched),
        }
    }

    /// Final value given the shared fetch result for this field's key.
    pub fn value_from(&self, fetched: Option<&str>) -> Value {
        match (&self.source, fetched) {
            (ValueSource::Constant(value), _) => value.clone(),
            (_, Some(raw)) => self.refine(raw),
            (_, None) => Value::Null,
        }
    }
}
