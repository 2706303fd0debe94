//! Converters from raw probe text to typed document values.
//!
//! Every converter has the [`Converter`] signature: it receives the text left
//! over after pattern matching and returns a JSON value or a
//! [`ConversionFailed`](crate::MachineStateError::ConversionFailed) error.
//! The acquisition loop never propagates that error; it keeps the
//! unconverted text instead.
//!
//! # Example
//!
//! ```
//! use machinestate::parse::{khz_to_hz, to_int_list};
//! use serde_json::json;
//!
//! assert_eq!(to_int_list("0-2,5").unwrap(), json!([0, 1, 2, 5]));
//! assert_eq!(khz_to_hz("2400000").unwrap(), json!(2_400_000_000u64));
//! ```

pub mod lists;
pub mod scalar;
pub mod units;

use serde_json::Value;

use crate::error::Result;

/// A pure function turning matched text into a typed value.
pub type Converter = fn(&str) -> Result<Value>;

pub use lists::{mask_to_list, to_int_list, to_str_list};
pub use scalar::{mpi_vendor, mpi_version, to_bool, to_float, to_int, to_string, to_title};
pub use units::{khz_list_to_hz_list, khz_to_hz, to_bytes};

/// Build the error every converter reports on bad input.
pub(crate) fn conversion_error(value: &str, message: impl Into<String>) -> crate::MachineStateError {
    crate::MachineStateError::ConversionFailed {
        value: value.to_string(),
        message: message.into(),
    }
}

/// Split on commas and whitespace, dropping empty parts.
pub(crate) fn split_items(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
}
