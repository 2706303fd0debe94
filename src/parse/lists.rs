//! List converters: word lists, CPU lists and hexadecimal bit masks.

use serde_json::Value;

use super::{conversion_error, split_items};
use crate::error::Result;

/// Split on commas and whitespace into a list of strings.
pub fn to_str_list(value: &str) -> Result<Value> {
    Ok(Value::Array(
        split_items(value)
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}

/// Parse a kernel CPU list such as `0-3,8,10-11` into integers.
pub fn to_int_list(value: &str) -> Result<Value> {
    let mut out = Vec::new();
    for part in split_items(value) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: i64 = start
                    .parse()
                    .map_err(|_| conversion_error(value, format!("bad range start '{part}'")))?;
                let end: i64 = end
                    .parse()
                    .map_err(|_| conversion_error(value, format!("bad range end '{part}'")))?;
                if end < start {
                    return Err(conversion_error(value, format!("empty range '{part}'")));
                }
                out.extend((start..=end).map(Value::from));
            }
            None => {
                let item: i64 = part
                    .parse()
                    .map_err(|_| conversion_error(value, format!("bad item '{part}'")))?;
                out.push(Value::from(item));
            }
        }
    }
    Ok(Value::Array(out))
}

/// Decode a hexadecimal bit mask into the indices of its set bits.
///
/// Comma-separated words are concatenated, most significant word first,
/// as the kernel prints `cpumask` files.
pub fn mask_to_list(value: &str) -> Result<Value> {
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u32> = trimmed
        .chars()
        .filter(|c| *c != ',')
        .map(|c| {
            c.to_digit(16)
                .ok_or_else(|| conversion_error(value, format!("'{c}' is not a hex digit")))
        })
        .collect::<Result<_>>()?;
    if digits.is_empty() {
        return Err(conversion_error(value, "empty mask"));
    }

    let mut bits = Vec::new();
    for (position, digit) in digits.iter().rev().enumerate() {
        for bit in 0..4 {
            if digit & (1 << bit) != 0 {
                bits.push(Value::from(position * 4 + bit));
            }
        }
    }
    Ok(Value::Array(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn str_list_splits_spaces_tabs_and_commas() {
        assert_eq!(to_str_list("a b c").unwrap(), json!(["a", "b", "c"]));
        assert_eq!(to_str_list("a\tb\tc").unwrap(), json!(["a", "b", "c"]));
        assert_eq!(to_str_list("a,b,c").unwrap(), json!(["a", "b", "c"]));
    }

    #[test]
    fn int_list_plain() {
        assert_eq!(to_int_list("1 2 3").unwrap(), json!([1, 2, 3]));
        assert_eq!(to_int_list("1,2,3").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn int_list_expands_ranges() {
        assert_eq!(to_int_list("0-3,8").unwrap(), json!([0, 1, 2, 3, 8]));
    }

    #[test]
    fn int_list_rejects_words() {
        assert!(to_int_list("a b c").is_err());
        assert!(to_int_list("3-1").is_err());
    }

    #[test]
    fn mask_single_byte() {
        let expected: Vec<usize> = (0..8).collect();
        assert_eq!(mask_to_list("ff").unwrap(), json!(expected));
        assert_eq!(mask_to_list("0xff").unwrap(), json!(expected));
    }

    #[test]
    fn mask_with_comma_words() {
        let expected: Vec<usize> = (0..16).collect();
        assert_eq!(mask_to_list("ff,FF").unwrap(), json!(expected));
    }

    #[test]
    fn mask_sparse_bits() {
        assert_eq!(mask_to_list("1").unwrap(), json!([0]));
        assert_eq!(mask_to_list("00000001,00000000").unwrap(), json!([32]));
    }

    #[test]
    fn mask_rejects_garbage() {
        assert!(mask_to_list("zz").is_err());
        assert!(mask_to_list("").is_err());
    }
}
