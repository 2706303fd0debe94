//! MachineState - Record the hardware and software state of a compute node.
//!
//! The state is a tree of [`group::InfoGroup`]s. Each group declares where
//! its values come from (files, commands, constants), how to extract them
//! and how to discover its children. The tree renders to a JSON document
//! that can be rebuilt later and compared against a fresh collection.
//!
//! # Modules
//!
//! - [`anonymize`] - Placeholder substitution for identifying values
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading
//! - [`error`] - Error types and result aliases
//! - [`group`] - Probe groups, discovery, documents and comparison
//! - [`parse`] - Converters from raw text to typed values
//! - [`probes`] - Built-in probe kinds and the root aggregator
//! - [`source`] - Value sources, pattern matching and command execution
//!
//! # Example
//!
//! ```
//! use machinestate::group::{GroupArgs, InfoGroup};
//! use machinestate::parse::to_float;
//! use machinestate::source::MockBackend;
//!
//! let mut backend = MockBackend::new();
//! backend.add_file("/proc/loadavg", "0.52 0.40 0.30 1/234 5678");
//!
//! let mut group = InfoGroup::new("LoadAvg", &GroupArgs::default());
//! group
//!     .add_file("LoadAvg1m", "/proc/loadavg", Some(r"^([\d.]+)"), Some(to_float))
//!     .unwrap();
//! group.update_with(&backend);
//! assert_eq!(group.value("LoadAvg1m"), Some(&serde_json::json!(0.52)));
//! ```

pub mod anonymize;
pub mod cli;
pub mod config;
pub mod error;
pub mod group;
pub mod parse;
pub mod probes;
pub mod source;

pub use config::MachineStateConfig;
pub use error::{MachineStateError, Result};
pub use group::{GroupArgs, InfoGroup, ProbeKind, ProbeRegistry};
pub use probes::collect;
