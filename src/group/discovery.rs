//! How a group finds out which children it has.
//!
//! Discovery only decides which children exist; it never acquires field
//! values. Each discovered child is generated recursively before it is
//! handed back to the parent.

use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use super::args::{ArgValue, GroupArgs, IDENT_KEY};
use super::registry::ProbeKind;
use super::InfoGroup;
use crate::error::{MachineStateError, Result};

/// One child of a multi-class group.
#[derive(Debug, Clone)]
pub struct ChildSpec {
    pub kind: ProbeKind,
    pub args: GroupArgs,
    /// Failures of optional children are logged and skipped.
    pub optional: bool,
}

impl ChildSpec {
    /// A child whose failure aborts generation of the parent.
    pub fn mandatory(kind: ProbeKind, args: GroupArgs) -> Self {
        Self {
            kind,
            args,
            optional: false,
        }
    }

    /// A child that is dropped when it fails to build.
    pub fn optional(kind: ProbeKind, args: GroupArgs) -> Self {
        Self {
            kind,
            args,
            optional: true,
        }
    }
}

/// Strategy populating a group's children during `generate()`.
#[derive(Debug, Clone, Default)]
pub enum Discovery {
    /// Children are fixed; only existing ones are regenerated.
    #[default]
    None,
    /// One child per filesystem entry matching `searchpath`, identified by
    /// the first capture of `pattern` over the entry's full path.
    PathMatch {
        searchpath: String,
        pattern: Regex,
        kind: ProbeKind,
        args: GroupArgs,
    },
    /// One child per caller-supplied identity, in caller order.
    List {
        idents: Vec<ArgValue>,
        kind: ProbeKind,
        args: GroupArgs,
    },
    /// One child per spec, each possibly of a different kind.
    MultiClass { children: Vec<ChildSpec> },
    /// Children of every strategy in turn.
    Chain(Vec<Discovery>),
}

impl Discovery {
    /// Path-match discovery; both the glob and the regex are validated now.
    pub fn path_match(
        searchpath: impl Into<String>,
        pattern: &str,
        kind: ProbeKind,
        args: GroupArgs,
    ) -> Result<Self> {
        let searchpath = searchpath.into();
        glob::Pattern::new(&searchpath).map_err(|e| MachineStateError::DiscoveryMisconfigured {
            group: kind.name.to_string(),
            message: format!("bad glob '{searchpath}': {e}"),
        })?;
        let pattern = Regex::new(pattern).map_err(|e| MachineStateError::DiscoveryMisconfigured {
            group: kind.name.to_string(),
            message: format!("bad identity pattern '{pattern}': {e}"),
        })?;
        Ok(Self::PathMatch {
            searchpath,
            pattern,
            kind,
            args,
        })
    }

    pub fn list(idents: Vec<ArgValue>, kind: ProbeKind, args: GroupArgs) -> Self {
        Self::List { idents, kind, args }
    }

    /// Multi-class discovery from parallel kind and argument lists.
    pub fn multi_class(kinds: Vec<ProbeKind>, args: Vec<GroupArgs>) -> Result<Self> {
        if kinds.len() != args.len() {
            return Err(MachineStateError::DiscoveryMisconfigured {
                group: "MultiClass".to_string(),
                message: format!(
                    "{} child kinds but {} argument sets",
                    kinds.len(),
                    args.len()
                ),
            });
        }
        Ok(Self::MultiClass {
            children: kinds
                .into_iter()
                .zip(args)
                .map(|(kind, args)| ChildSpec::mandatory(kind, args))
                .collect(),
        })
    }

    pub fn children(children: Vec<ChildSpec>) -> Self {
        Self::MultiClass { children }
    }

    pub fn chain(strategies: Vec<Discovery>) -> Self {
        Self::Chain(strategies)
    }

    /// Build and generate the children this strategy describes.
    ///
    /// Returns `None` for [`Discovery::None`], meaning existing children
    /// stay as they are.
    pub(crate) fn discover(&self, owner: &str) -> Result<Option<Vec<InfoGroup>>> {
        match self {
            Self::None => Ok(None),
            Self::PathMatch {
                searchpath,
                pattern,
                kind,
                args,
            } => {
                let idents = path_identities(searchpath, pattern)?;
                debug!(group = owner, count = idents.len(), "path-match discovery");
                build_idents(idents, kind, args).map(Some)
            }
            Self::List { idents, kind, args } => build_idents(idents.clone(), kind, args).map(Some),
            Self::MultiClass { children } => {
                let mut out = Vec::with_capacity(children.len());
                for spec in children {
                    match build_child(&spec.kind, &spec.args) {
                        Ok(child) => out.push(child),
                        Err(e) if spec.optional => {
                            warn!(group = owner, child = spec.kind.name, error = %e, "skipping optional subsystem");
                        }
                        Err(e) => {
                            return Err(MachineStateError::SubsystemFailed {
                                name: spec.kind.name.to_string(),
                                message: e.to_string(),
                            })
                        }
                    }
                }
                Ok(Some(out))
            }
            Self::Chain(strategies) => {
                let mut out = Vec::new();
                for strategy in strategies {
                    if let Some(children) = strategy.discover(owner)? {
                        out.extend(children);
                    }
                }
                Ok(Some(out))
            }
        }
    }
}

fn build_child(kind: &ProbeKind, args: &GroupArgs) -> Result<InfoGroup> {
    let mut child = kind.build(args)?;
    child.generate()?;
    Ok(child)
}

fn build_idents(idents: Vec<ArgValue>, kind: &ProbeKind, args: &GroupArgs) -> Result<Vec<InfoGroup>> {
    idents
        .into_iter()
        .map(|ident| build_child(kind, &args.clone().with(IDENT_KEY, ident)))
        .collect()
}

/// Identities of all paths matching `searchpath`.
///
/// Sorted numerically when every identity is an integer, lexically
/// otherwise. Integers that only differ in zero padding stay text so each
/// matched path keeps its own child. An empty match set yields no
/// identities.
pub fn path_identities(searchpath: &str, pattern: &Regex) -> Result<Vec<ArgValue>> {
    let paths = glob::glob(searchpath).map_err(|e| MachineStateError::DiscoveryMisconfigured {
        group: searchpath.to_string(),
        message: e.to_string(),
    })?;

    let mut raw = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if let Some(ident) = identity_of(&path, pattern) {
                    raw.push(ident);
                }
            }
            Err(e) => debug!(error = %e, "unreadable glob entry"),
        }
    }

    raw.sort();
    let matched = raw.len();
    raw.dedup();
    if raw.len() < matched {
        warn!(searchpath, dropped = matched - raw.len(), "paths share an identity");
    }

    let numeric: Option<Vec<i64>> = raw.iter().map(|s| s.parse().ok()).collect();
    let idents = match numeric {
        Some(mut numbers) => {
            numbers.sort_unstable();
            numbers.dedup();
            if numbers.len() == raw.len() {
                numbers.into_iter().map(ArgValue::Int).collect()
            } else {
                debug!(searchpath, "numeric identities collide, keeping them as text");
                raw.into_iter().map(ArgValue::Str).collect()
            }
        }
        None => raw.into_iter().map(ArgValue::Str).collect(),
    };
    Ok(idents)
}

fn identity_of(path: &Path, pattern: &Regex) -> Option<String> {
    let text = path.to_str()?;
    let caps = pattern.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string())
}
