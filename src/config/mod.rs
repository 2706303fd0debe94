//! Configuration loading for machinestate.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//!
//! # Example
//!
//! ```
//! use machinestate::config::load_config_file;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("config.yml");
//! fs::write(&path, "extended: true\nlikwid_enable: false\n").unwrap();
//!
//! let config = load_config_file(&path).unwrap();
//! assert!(config.extended);
//! assert!(!config.likwid_enable);
//! assert_eq!(config.indent, 4);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_file, parse_config, ConfigPaths};
pub use schema::MachineStateConfig;
