//! Configuration schema for machinestate.
//!
//! The same struct is read from `config.yml`, overridden by command-line
//! flags and printed by `machinestate --config`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MachineStateError, Result};
use crate::group::{CompareOptions, RenderOptions, DEFAULT_TOLERANCE};
use crate::probes::{DEFAULT_DMIFILE, DEFAULT_MODULECMD};

/// Effective configuration of a collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineStateConfig {
    /// Collect the extended field set.
    pub extended: bool,

    /// Replace identifying values with a placeholder.
    pub anonymous: bool,

    /// Sort keys in the rendered document.
    pub sort: bool,

    /// Indentation of the rendered document; 0 is compact.
    pub indent: usize,

    /// Executable to describe in an `ExecutableInfo` group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Saved `dmidecode` output.
    pub dmifile: PathBuf,

    /// Run likwid tools for prefetcher and turbo data.
    pub likwid_enable: bool,

    /// Directory holding the likwid tools; PATH is searched when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likwid_path: Option<PathBuf>,

    /// Environment modules command used to detect module support.
    pub modulecmd: String,

    /// Seconds before a probe command is killed.
    pub command_timeout_secs: u64,

    /// Relative tolerance for numeric comparison.
    pub tolerance: f64,

    /// Extra blobs stored verbatim as top-level fields of the document.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub auxiliary: BTreeMap<String, Value>,
}

impl Default for MachineStateConfig {
    fn default() -> Self {
        Self {
            extended: false,
            anonymous: false,
            sort: false,
            indent: 4,
            executable: None,
            dmifile: PathBuf::from(DEFAULT_DMIFILE),
            likwid_enable: true,
            likwid_path: None,
            modulecmd: DEFAULT_MODULECMD.to_string(),
            command_timeout_secs: 10,
            tolerance: DEFAULT_TOLERANCE,
            auxiliary: BTreeMap::new(),
        }
    }
}

impl MachineStateConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Rendering settings; documents always carry metadata.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            meta: true,
            sort: self.sort,
            indent: self.indent,
        }
    }

    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            tolerance: self.tolerance,
        }
    }

    /// Reject values that cannot drive a collection run.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(MachineStateError::InvalidArgument {
                message: format!("tolerance must be a non-negative number, got {}", self.tolerance),
            });
        }
        if self.command_timeout_secs == 0 {
            return Err(MachineStateError::InvalidArgument {
                message: "command_timeout_secs must be at least 1".to_string(),
            });
        }
        if self.modulecmd.trim().is_empty() {
            return Err(MachineStateError::InvalidArgument {
                message: "modulecmd must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MachineStateConfig::default();
        assert!(!config.extended);
        assert_eq!(config.indent, 4);
        assert_eq!(config.dmifile, PathBuf::from("/etc/dmidecode.txt"));
        assert!(config.likwid_enable);
        assert_eq!(config.modulecmd, "modulecmd");
        assert_eq!(config.command_timeout(), Duration::from_secs(10));
        assert_eq!(config.tolerance, 0.2);
        config.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: MachineStateConfig =
            serde_yaml::from_str("extended: true\nlikwid_path: /opt/likwid/bin\n").unwrap();
        assert!(config.extended);
        assert_eq!(config.likwid_path, Some(PathBuf::from("/opt/likwid/bin")));
        assert_eq!(config.indent, 4);
    }

    #[test]
    fn auxiliary_blobs_accept_nested_yaml() {
        let config: MachineStateConfig = serde_yaml::from_str(
            "auxiliary:\n  Benchmark:\n    name: stream\n    threads: [1, 2, 4]\n",
        )
        .unwrap();
        assert_eq!(
            config.auxiliary["Benchmark"],
            serde_json::json!({"name": "stream", "threads": [1, 2, 4]})
        );
    }

    #[test]
    fn validation_rejects_negative_tolerance() {
        let config = MachineStateConfig {
            tolerance: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let config = MachineStateConfig {
            command_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
