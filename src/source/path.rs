//! Executable lookup on the search path.

use std::path::{Path, PathBuf};

/// A regular file with at least one execute bit.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Without permission bits any regular file counts.
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Directories listed in `PATH`, in search order.
pub fn parse_system_path() -> Vec<PathBuf> {
    match std::env::var_os("PATH") {
        Some(value) => std::env::split_paths(&value).collect(),
        None => Vec::new(),
    }
}

/// First executable named `tool` in `search_dirs`.
///
/// The lookup is done here instead of spawning `which`, which is a shell
/// builtin on some systems.
pub fn resolve_tool_path(tool: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable(candidate))
}

/// Locate an executable. Names containing a path separator are checked
/// directly, bare names are searched on PATH.
pub fn which(tool: &str) -> Option<PathBuf> {
    if tool.is_empty() {
        return None;
    }
    if tool.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(tool);
        return is_executable(&path).then_some(path);
    }
    resolve_tool_path(tool, &parse_system_path())
}
