//! Anonymization of host- and user-identifying values.
//!
//! Probes opt in per field by marking it identifying; when the owning group
//! is anonymous, those values are replaced by [`PLACEHOLDER`] before they
//! are stored. Free-form text (environment values, command lines) is
//! scrubbed with an [`Anonymizer`] instead.

mod mask;
mod pattern;

pub use mask::{anonymize_value, scrub_addresses, Anonymizer, PLACEHOLDER};
pub use pattern::{IdentifyingMatcher, IdentifyingPattern, BUILTIN_PATTERNS};
