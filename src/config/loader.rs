//! Configuration file discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::schema::MachineStateConfig;
use crate::error::{MachineStateError, Result};

/// Where a configuration file may live.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// User config: `$XDG_CONFIG_HOME/machinestate/config.yml`
    pub user: Option<PathBuf>,
}

impl ConfigPaths {
    /// Look for the user config file.
    pub fn discover() -> Self {
        Self {
            user: Self::find_user_config(),
        }
    }

    fn find_user_config() -> Option<PathBuf> {
        let path = dirs::config_dir()?.join("machinestate").join("config.yml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }
}

/// Load a single config file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if it is neither valid YAML nor JSON.
pub fn load_config_file(path: &Path) -> Result<MachineStateConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MachineStateError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MachineStateError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML (or JSON, which is valid YAML) into a config.
///
/// An empty file yields the defaults.
pub fn parse_config(content: &str, source_path: &Path) -> Result<MachineStateConfig> {
    if content.trim().is_empty() {
        return Ok(MachineStateConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| MachineStateError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the effective file configuration.
///
/// An explicit `config_override` must exist. Without one the user config
/// is used when present, the defaults otherwise.
pub fn load_config(config_override: Option<&Path>) -> Result<MachineStateConfig> {
    let path = match config_override {
        Some(path) => Some(path.to_path_buf()),
        None => ConfigPaths::discover().user,
    };
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            load_config_file(&path)?
        }
        None => MachineStateConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_config_file_reads_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(&path, "anonymous: true\nindent: 2\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert!(config.anonymous);
        assert_eq!(config.indent, 2);
    }

    #[test]
    fn load_config_file_reads_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"extended": true, "dmifile": "/tmp/dmi.txt"}"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert!(config.extended);
        assert_eq!(config.dmifile, PathBuf::from("/tmp/dmi.txt"));
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let err = load_config_file(Path::new("/nonexistent/machinestate.yml")).unwrap_err();
        assert!(matches!(err, MachineStateError::ConfigNotFound { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(&path, "indent: [not a number").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, MachineStateError::ConfigParseError { .. }));
    }

    #[test]
    fn empty_file_is_default() {
        let config = parse_config("  \n", Path::new("config.yml")).unwrap();
        assert_eq!(config, MachineStateConfig::default());
    }

    #[test]
    fn explicit_override_is_validated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(&path, "tolerance: -1.0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
