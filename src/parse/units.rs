//! Unit-carrying converters: byte counts and frequencies.

use serde_json::Value;

use super::conversion_error;
use crate::error::Result;

/// Split `"1234.5 kHz"` into `("1234.5", "kHz")`.
fn split_number_unit(value: &str) -> Option<(&str, &str)> {
    let trimmed = value.trim();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    Some((&trimmed[..end], trimmed[end..].trim()))
}

/// Parse a byte count with an optional unit suffix.
///
/// `kB`, `KiB`, `MB`, ... are all binary multiples, matching the kernel's
/// use of `kB` in `/proc/meminfo`. Unknown suffixes keep the bare number.
pub fn to_bytes(value: &str) -> Result<Value> {
    let (number, unit) =
        split_number_unit(value).ok_or_else(|| conversion_error(value, "no leading number"))?;
    let count: u64 = number
        .parse()
        .map_err(|_| conversion_error(value, "byte count must be an integer"))?;
    let multiplier: u64 = match unit.to_ascii_lowercase().as_str() {
        "kb" | "kib" | "k" => 1 << 10,
        "mb" | "mib" | "m" => 1 << 20,
        "gb" | "gib" | "g" => 1 << 30,
        "tb" | "tib" | "t" => 1 << 40,
        _ => 1,
    };
    count
        .checked_mul(multiplier)
        .map(Value::from)
        .ok_or_else(|| conversion_error(value, "byte count overflows"))
}

fn frequency_in_hz(item: &str, whole: &str) -> Result<u64> {
    let (number, unit) =
        split_number_unit(item).ok_or_else(|| conversion_error(whole, "no leading number"))?;
    let mantissa: f64 = number
        .parse()
        .map_err(|_| conversion_error(whole, format!("bad number '{number}'")))?;
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "khz" => 1e3,
        "hz" => 1.0,
        "mhz" => 1e6,
        "ghz" => 1e9,
        other => return Err(conversion_error(whole, format!("unknown unit '{other}'"))),
    };
    Ok((mantissa * multiplier).round() as u64)
}

/// Convert a frequency to Hz. Unit-less values are taken as kHz, the unit
/// used by cpufreq sysfs files.
pub fn khz_to_hz(value: &str) -> Result<Value> {
    frequency_in_hz(value, value).map(Value::from)
}

/// Convert a comma or whitespace separated list of frequencies to Hz.
pub fn khz_list_to_hz_list(value: &str) -> Result<Value> {
    let mut out = Vec::new();
    let mut rest = value.trim();
    while !rest.is_empty() {
        let start = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if start.is_empty() {
            break;
        }
        // An item is a number plus an optional unit that may follow a space.
        let number_end = start
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(start.len());
        let after_number = &start[number_end..];
        let unit_start = after_number.len() - after_number.trim_start_matches(' ').len();
        let unit_len = after_number[unit_start..]
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after_number.len() - unit_start);
        let item_end = if unit_len > 0 {
            number_end + unit_start + unit_len
        } else {
            number_end
        };
        if item_end == 0 {
            return Err(conversion_error(value, format!("unexpected text '{start}'")));
        }
        out.push(Value::from(frequency_in_hz(&start[..item_end], value)?));
        rest = &start[item_end..];
    }
    Ok(Value::Array(out))
}
