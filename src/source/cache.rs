//! Per-pass memo of fetched sources.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{SourceBackend, SourceKey, ValueSource};

/// Fetch results of one update pass of one group.
///
/// Field resolution and update hooks share the cache, so a hook that needs
/// the raw text of a file or command already read for a field gets it
/// without touching the system again.
pub struct SourceCache<'a> {
    backend: &'a dyn SourceBackend,
    fetched: HashMap<SourceKey, Option<String>>,
}

impl<'a> SourceCache<'a> {
    pub fn new(backend: &'a dyn SourceBackend) -> Self {
        Self {
            backend,
            fetched: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &'a dyn SourceBackend {
        self.backend
    }

    /// Raw text of `source` under `key`, fetching it on first use.
    ///
    /// Failures are logged and remembered as `None`.
    pub fn resolve(&mut self, key: SourceKey, source: &ValueSource) -> Option<&str> {
        let backend = self.backend;
        self.fetched
            .entry(key)
            .or_insert_with(|| match source.fetch(backend) {
                Ok(text) => text,
                Err(e) => {
                    debug!(source = %source, error = %e, "source unavailable");
                    None
                }
            })
            .as_deref()
    }

    /// Contents of a file, shared with any field reading the same path.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Option<String> {
        let path = path.as_ref();
        let source = ValueSource::file(path);
        self.resolve(SourceKey::File(path.to_path_buf()), &source)
            .map(str::to_string)
    }

    /// Stdout of a command, shared with any field running the same command.
    pub fn run_command(&mut self, executable: &str, args: &str) -> Option<String> {
        let source = ValueSource::command(executable, args);
        self.resolve(
            SourceKey::Command(executable.to_string(), args.to_string()),
            &source,
        )
        .map(str::to_string)
    }

    /// Paths matching a glob pattern, listed through the backend.
    pub fn glob(&self, pattern: &str) -> Vec<PathBuf> {
        self.backend.glob(pattern)
    }

    /// Number of distinct sources touched so far.
    pub fn len(&self) -> usize {
        self.fetched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetched.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockBackend;

    #[test]
    fn repeated_reads_hit_the_backend_once() {
        let mut backend = MockBackend::new();
        backend.add_file("/proc/loadavg", "0.1 0.2 0.3 1/100 42");
        backend.add_command("hostname", "-s", "node1");

        let mut cache = SourceCache::new(&backend);
        assert_eq!(cache.read_file("/proc/loadavg").as_deref(), Some("0.1 0.2 0.3 1/100 42"));
        assert_eq!(cache.read_file("/proc/loadavg").as_deref(), Some("0.1 0.2 0.3 1/100 42"));
        assert_eq!(cache.run_command("hostname", "-s").as_deref(), Some("node1"));
        assert_eq!(cache.run_command("hostname", "-s").as_deref(), Some("node1"));

        assert_eq!(backend.file_reads("/proc/loadavg"), 1);
        assert_eq!(backend.command_runs("hostname", "-s"), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_remembered() {
        let backend = MockBackend::new();
        let mut cache = SourceCache::new(&backend);
        assert_eq!(cache.read_file("/missing"), None);
        assert_eq!(cache.read_file("/missing"), None);
        assert_eq!(backend.file_reads("/missing"), 1);
    }
}
