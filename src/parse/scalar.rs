//! Scalar converters: numbers, booleans, identifiers and MPI banners.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};

use super::conversion_error;
use crate::error::Result;

static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+\.\d+\.\d+)").unwrap());

/// Intel MPI reports e.g. "Version 2019 Update 8 Build 20200624 (id: 4f16ad915)".
static INTEL_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Version (\d+) Update (\d+) Build (\d+) \(id: (\w+)\)").unwrap()
});

/// Parse a signed integer.
pub fn to_int(value: &str) -> Result<Value> {
    value
        .trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|e| conversion_error(value, e.to_string()))
}

/// Parse a floating point number.
pub fn to_float(value: &str) -> Result<Value> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|e| conversion_error(value, e.to_string()))?;
    Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| conversion_error(value, "not a finite number"))
}

/// Parse a kernel-style boolean ("1", "0", "enabled", "off", ...).
pub fn to_bool(value: &str) -> Result<Value> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" | "y" => Ok(Value::Bool(true)),
        "0" | "false" | "no" | "off" | "disabled" | "n" => Ok(Value::Bool(false)),
        _ => Err(conversion_error(value, "not a boolean")),
    }
}

/// Keep the text as a plain string.
pub fn to_string(value: &str) -> Result<Value> {
    Ok(Value::String(value.to_string()))
}

/// Title-case every word and drop underscores and spaces.
///
/// `"long_term"` becomes `"LongTerm"`, `"package-0"` becomes `"Package-0"`.
pub fn to_title(value: &str) -> Result<Value> {
    Ok(Value::String(title_case(value)))
}

pub(crate) fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            previous_alpha = false;
            if c != '_' && c != ' ' {
                out.push(c);
            }
        }
    }
    out
}

/// Classify the vendor of an MPI launcher from its `--version` output.
pub fn mpi_vendor(value: &str) -> Result<Value> {
    let vendor = if value.contains("Open MPI") || value.contains("OpenRTE") {
        "OpenMPI"
    } else if value.contains("Intel") && value.contains("MPI") {
        "IntelMPI"
    } else if value.contains("slurm") {
        "Slurm"
    } else if value.contains("HYDRA") || value.contains("MPICH") {
        "MPICH"
    } else {
        "Unknown"
    };
    Ok(Value::String(vendor.to_string()))
}

/// Extract the version of an MPI launcher from its `--version` output.
pub fn mpi_version(value: &str) -> Result<Value> {
    for line in value.lines() {
        if let Some(caps) = SEMVER_RE.captures(line) {
            return Ok(Value::String(caps[1].to_string()));
        }
        if let Some(caps) = INTEL_VERSION_RE.captures(line) {
            return Ok(Value::String(format!("{}.{}", &caps[1], &caps[2])));
        }
    }
    Err(conversion_error(value, "no version found"))
}
