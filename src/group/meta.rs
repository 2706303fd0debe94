//! The reserved metadata string describing how to rebuild a group.
//!
//! The string is a constructor call expression:
//! `CpuTopologyEntry(extended=true, ident=3)`. Literal values are typed:
//! integers, floats, `true`/`false`, `null` and double- or single-quoted
//! strings are distinguished when parsing.

use super::args::{ArgValue, GroupArgs};
use crate::error::{MachineStateError, Result};

/// Reserved document key holding the meta string.
pub const META_KEY: &str = "_meta";

const EXTENDED: &str = "extended";
const ANONYMOUS: &str = "anonymous";

/// Render the meta string of a group of `kind` built with `args`.
///
/// Flags appear only when set. Parameters appear as given, so callers
/// leave out arguments that match a factory's default.
pub fn encode_meta(kind: &str, args: &GroupArgs) -> String {
    let mut parts = Vec::new();
    if args.extended {
        parts.push(format!("{EXTENDED}=true"));
    }
    if args.anonymous {
        parts.push(format!("{ANONYMOUS}=true"));
    }
    for (key, value) in args.params() {
        parts.push(format!("{key}={value}"));
    }
    format!("{kind}({})", parts.join(", "))
}

/// Parse a meta string back into the kind name and its arguments.
pub fn parse_meta(meta: &str) -> Result<(String, GroupArgs)> {
    let mut parser = Parser {
        input: meta,
        rest: meta,
    };
    let kind = parser.identifier()?;
    parser.expect('(')?;
    let mut args = GroupArgs::default();
    if !parser.eat(')') {
        loop {
            let key = parser.identifier()?;
            parser.expect('=')?;
            let value = parser.literal()?;
            match (key.as_str(), &value) {
                (EXTENDED, ArgValue::Bool(v)) => args.extended = *v,
                (ANONYMOUS, ArgValue::Bool(v)) => args.anonymous = *v,
                (EXTENDED | ANONYMOUS, _) => {
                    return Err(parser.error(&format!("'{key}' must be a boolean")))
                }
                _ => args.set(&key, value),
            }
            if parser.eat(')') {
                break;
            }
            parser.expect(',')?;
        }
    }
    parser.skip_ws();
    if !parser.rest.is_empty() {
        return Err(parser.error("trailing characters"));
    }
    Ok((kind, args))
}

struct Parser<'a> {
    input: &'a str,
    rest: &'a str,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> MachineStateError {
        let position = self.input.len() - self.rest.len();
        MachineStateError::Reconstruction {
            fragment: self.input.to_string(),
            message: format!("{message} at offset {position}"),
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn identifier(&mut self) -> Result<String> {
        self.skip_ws();
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        let ident = &self.rest[..end];
        if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected identifier"));
        }
        self.rest = &self.rest[end..];
        Ok(ident.to_string())
    }

    fn literal(&mut self) -> Result<ArgValue> {
        self.skip_ws();
        match self.rest.chars().next() {
            Some(quote @ ('"' | '\'')) => self.string(quote),
            Some(_) => {
                let end = self
                    .rest
                    .find(|c: char| c == ',' || c == ')' || c.is_whitespace())
                    .unwrap_or(self.rest.len());
                let token = &self.rest[..end];
                let value = match token {
                    "null" | "None" => ArgValue::Null,
                    "true" | "True" => ArgValue::Bool(true),
                    "false" | "False" => ArgValue::Bool(false),
                    _ => {
                        if let Ok(v) = token.parse::<i64>() {
                            ArgValue::Int(v)
                        } else if let Ok(v) = token.parse::<f64>() {
                            if !v.is_finite() {
                                return Err(self.error(&format!("bad literal '{token}'")));
                            }
                            ArgValue::Float(v)
                        } else {
                            return Err(self.error(&format!("bad literal '{token}'")));
                        }
                    }
                };
                self.rest = &self.rest[end..];
                Ok(value)
            }
            None => Err(self.error("expected value")),
        }
    }

    fn string(&mut self, quote: char) -> Result<ArgValue> {
        let mut out = String::new();
        let mut chars = self.rest.char_indices().skip(1);
        while let Some((index, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                c if c == quote => {
                    self.rest = &self.rest[index + c.len_utf8()..];
                    return Ok(ArgValue::Str(out));
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }
}
