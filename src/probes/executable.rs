//! Facts about a user-named executable: location, size, digest and the
//! shared libraries it links against.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::group::{ChildSpec, Discovery, GroupArgs, InfoGroup, ProbeKind};
use crate::source::{which, SourceCache};

pub const EXECUTABLE_INFO: ProbeKind = ProbeKind::new("ExecutableInfo", executable_info);
pub const EXECUTABLE_EXEC: ProbeKind = ProbeKind::new("ExecutableInfoExec", executable_exec);
pub const EXECUTABLE_LIBRARIES: ProbeKind =
    ProbeKind::new("ExecutableInfoLibraries", executable_libraries);

/// Where `executable` lives: PATH lookup for bare names, then the
/// canonical absolute path. Falls back to the name as given.
pub fn resolve_executable(executable: &str) -> PathBuf {
    let found = which(executable).unwrap_or_else(|| PathBuf::from(executable));
    fs::canonicalize(&found).unwrap_or(found)
}

fn executable_info(args: &GroupArgs) -> Result<InfoGroup> {
    let executable = args.str("executable")?;
    let mut group = InfoGroup::new("ExecutableInfo", args);
    let child_args = args.inherit().with("executable", executable);
    group.set_discovery(Discovery::children(vec![
        ChildSpec::mandatory(EXECUTABLE_EXEC, child_args.clone()),
        ChildSpec::mandatory(EXECUTABLE_LIBRARIES, child_args),
    ]));
    Ok(group)
}

fn executable_exec(args: &GroupArgs) -> Result<InfoGroup> {
    let executable = args.str("executable")?;
    let abspath = resolve_executable(executable);
    let mut group = InfoGroup::new("ExecutableInfo", args);
    group.add_constant("Name", executable);
    group.add_constant("Abspath", abspath.display().to_string());
    group.add_constant("Size", Value::Null);
    if args.extended {
        group.add_constant("SHA256sum", Value::Null);
    }
    group.require(&["Name", "Size", "SHA256sum"]);
    group.on_update(file_facts);
    Ok(group)
}

/// Size and, in extended mode, content digest of the resolved file.
fn file_facts(group: &mut InfoGroup, _cache: &mut SourceCache<'_>) {
    let Some(path) = group.value("Abspath").and_then(Value::as_str).map(PathBuf::from) else {
        return;
    };
    let size = fs::metadata(&path).map(|m| Value::from(m.len())).unwrap_or(Value::Null);
    group.set_value("Size", size);
    if group.extended() {
        group.set_value("SHA256sum", sha256_file(&path).map(Value::String).unwrap_or(Value::Null));
    }
}

/// Hex-encoded SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(hex::encode(Sha256::digest(&bytes))),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot hash executable");
            None
        }
    }
}

fn executable_libraries(args: &GroupArgs) -> Result<InfoGroup> {
    args.str("executable")?;
    let mut group = InfoGroup::new("Libraries", args);
    group.on_update(linked_libraries);
    Ok(group)
}

fn linked_libraries(group: &mut InfoGroup, cache: &mut SourceCache<'_>) {
    let Ok(executable) = group.args().str("executable") else {
        return;
    };
    let path = resolve_executable(executable).display().to_string();
    let Some(output) = cache.run_command("ldd", &path) else {
        return;
    };
    for (library, location) in parse_ldd(&output) {
        group.set_value(library, location);
    }
}

/// Map each library in `ldd` output to its resolved path.
///
/// Libraries without a `=>` target map to themselves when they name an
/// existing file (the dynamic loader) and to null otherwise.
pub fn parse_ldd(output: &str) -> Map<String, Value> {
    let mut libraries = Map::new();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let Some(library) = parts.next() else {
            continue;
        };
        let location = match (parts.next(), parts.next()) {
            (Some("=>"), Some("not")) => Value::Null,
            (Some("=>"), Some(target)) if !target.starts_with('(') => {
                Value::String(target.to_string())
            }
            _ if Path::new(library).exists() => Value::String(library.to_string()),
            _ => Value::Null,
        };
        libraries.insert(library.to_string(), location);
    }
    libraries
}
