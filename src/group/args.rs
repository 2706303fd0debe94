//! Typed constructor arguments passed to group factories.

use std::fmt;

use serde_json::Value;

use crate::error::{MachineStateError, Result};

/// A scalar constructor argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ArgValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text used when the argument names a group or path component.
    pub fn label(&self) -> String {
        match self {
            Self::Str(v) => v.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(v) => Value::Bool(*v),
            Self::Int(v) => Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Str(v) => Value::String(v.clone()),
        }
    }
}

/// Literal form as embedded in a meta string.
impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            // Debug keeps a decimal point on whole floats ("2.0").
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(v) => {
                f.write_str("\"")?;
                for c in v.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for ArgValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Constructor arguments of a group.
///
/// `extended` and `anonymous` are threaded from parent to child; `params`
/// are kind-specific and kept in insertion order so meta strings are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupArgs {
    pub extended: bool,
    pub anonymous: bool,
    params: Vec<(String, ArgValue)>,
}

impl GroupArgs {
    pub fn new(extended: bool, anonymous: bool) -> Self {
        Self {
            extended,
            anonymous,
            params: Vec::new(),
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl Into<ArgValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a parameter, replacing an earlier value for the same key.
    pub fn set(&mut self, key: &str, value: impl Into<ArgValue>) {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn params(&self) -> &[(String, ArgValue)] {
        &self.params
    }

    /// Flags only, for handing to a child.
    pub fn inherit(&self) -> GroupArgs {
        GroupArgs::new(self.extended, self.anonymous)
    }

    /// Required integer parameter.
    pub fn int(&self, key: &str) -> Result<i64> {
        self.get(key)
            .and_then(ArgValue::as_int)
            .ok_or_else(|| missing(key, "an integer"))
    }

    /// Required string parameter.
    pub fn str(&self, key: &str) -> Result<&str> {
        self.get(key)
            .and_then(ArgValue::as_str)
            .ok_or_else(|| missing(key, "a string"))
    }

    /// Optional string parameter; null counts as absent.
    pub fn opt_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ArgValue::as_str)
    }

    /// Boolean parameter with a default.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(ArgValue::as_bool).unwrap_or(default)
    }

    /// The discovered identity of a path-match or list child.
    pub fn ident(&self) -> Result<&ArgValue> {
        self.get(IDENT_KEY).ok_or_else(|| missing(IDENT_KEY, "an identity"))
    }
}

/// Parameter key carrying a discovered identity.
pub const IDENT_KEY: &str = "ident";

fn missing(key: &str, what: &str) -> MachineStateError {
    MachineStateError::InvalidArgument {
        message: format!("constructor argument '{key}' must be {what}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_keys_in_place() {
        let mut args = GroupArgs::default().with("a", 1).with("b", "x");
        args.set("a", 2);
        assert_eq!(
            args.params(),
            &[
                ("a".to_string(), ArgValue::Int(2)),
                ("b".to_string(), ArgValue::Str("x".to_string())),
            ]
        );
    }

    #[test]
    fn typed_accessors() {
        let args = GroupArgs::new(true, false)
            .with("ident", 3)
            .with("executable", "gcc")
            .with("likwid", false)
            .with("path", None::<String>);
        assert_eq!(args.int("ident").unwrap(), 3);
        assert_eq!(args.str("executable").unwrap(), "gcc");
        assert!(!args.flag("likwid", true));
        assert!(args.flag("absent", true));
        assert_eq!(args.opt_str("path"), None);
        assert!(args.int("executable").is_err());
        assert_eq!(args.ident().unwrap(), &ArgValue::Int(3));
    }

    #[test]
    fn inherit_keeps_only_flags() {
        let args = GroupArgs::new(true, true).with("ident", 1);
        assert_eq!(args.inherit(), GroupArgs::new(true, true));
    }

    #[test]
    fn literals_render_distinctly() {
        assert_eq!(ArgValue::Null.to_string(), "null");
        assert_eq!(ArgValue::Bool(true).to_string(), "true");
        assert_eq!(ArgValue::Int(-4).to_string(), "-4");
        assert_eq!(ArgValue::Float(2.0).to_string(), "2.0");
        assert_eq!(ArgValue::from("a\"b").to_string(), r#""a\"b""#);
    }

    #[test]
    fn labels_are_unquoted() {
        assert_eq!(ArgValue::from("package-0").label(), "package-0");
        assert_eq!(ArgValue::Int(7).label(), "7");
    }
}
