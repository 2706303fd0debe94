//! Group kinds and the registry used to rebuild trees from documents.
//!
//! Every group kind is a [`ProbeKind`]: a name plus a factory. The name is
//! what ends up in the meta string, the factory builds an empty group from
//! typed arguments. The registry holds both the built-in probe kinds and
//! any custom kinds registered by the caller.

use std::collections::HashMap;

use super::args::GroupArgs;
use super::InfoGroup;
use crate::error::{MachineStateError, Result};

/// Builds an empty group of one kind from its constructor arguments.
pub type GroupFactory = fn(&GroupArgs) -> Result<InfoGroup>;

/// A named group factory.
#[derive(Debug, Clone, Copy)]
pub struct ProbeKind {
    pub name: &'static str,
    pub factory: GroupFactory,
}

impl ProbeKind {
    pub const fn new(name: &'static str, factory: GroupFactory) -> Self {
        Self { name, factory }
    }

    /// Build a group and stamp it with this kind and `args`.
    ///
    /// Stamping keeps the meta string in sync with how the group was made,
    /// whatever the factory did internally.
    pub fn build(&self, args: &GroupArgs) -> Result<InfoGroup> {
        let mut group = (self.factory)(args)?;
        group.stamp(self.name, args.clone());
        Ok(group)
    }
}

/// Lookup table from kind name to [`ProbeKind`].
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    kinds: HashMap<&'static str, ProbeKind>,
}

impl ProbeRegistry {
    /// Registry containing every built-in probe kind.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for kind in crate::probes::builtin_kinds() {
            registry.register(kind);
        }
        registry
    }

    /// Registry without any kinds.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a kind.
    pub fn register(&mut self, kind: ProbeKind) {
        self.kinds.insert(kind.name, kind);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, kind: ProbeKind) -> Self {
        self.register(kind);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ProbeKind> {
        self.kinds.get(name)
    }

    /// Look up a kind, failing with [`MachineStateError::UnknownGroupKind`].
    pub fn lookup(&self, name: &str) -> Result<&ProbeKind> {
        self.get(name)
            .ok_or_else(|| MachineStateError::UnknownGroupKind {
                kind: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// All registered kind names, sorted.
    pub fn known_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(args: &GroupArgs) -> Result<InfoGroup> {
        let mut group = InfoGroup::new("Custom", args);
        group.add_constant("Answer", 42);
        Ok(group)
    }

    #[test]
    fn build_stamps_kind_and_args() {
        let kind = ProbeKind::new("CustomProbe", custom);
        let args = GroupArgs::new(true, false).with("ident", 1);
        let group = kind.build(&args).unwrap();
        assert_eq!(group.kind(), "CustomProbe");
        assert_eq!(group.args(), &args);
        assert_eq!(group.meta(), "CustomProbe(extended=true, ident=1)");
    }

    #[test]
    fn builtin_registry_knows_core_kinds() {
        let registry = ProbeRegistry::new();
        for name in ["InfoGroup", "MachineState", "HostInfo", "CpuTopology", "CacheTopologyClass"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.known_names().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = ProbeRegistry::empty().with(ProbeKind::new("CustomProbe", custom));
        assert_eq!(registry.len(), 1);
        let err = registry.lookup("Nope").unwrap_err();
        assert!(matches!(err, MachineStateError::UnknownGroupKind { .. }));
    }
}
