//! The probe group: a named node of the collection tree.
//!
//! An [`InfoGroup`] declares named [`Field`]s and owns child groups. Its
//! lifecycle is
//!
//! 1. construction by a [`ProbeKind`] factory,
//! 2. [`generate`](InfoGroup::generate): the group's [`Discovery`] decides
//!    which children exist, recursively,
//! 3. [`update`](InfoGroup::update): every field is acquired, sources shared
//!    by several fields are resolved once, then children are updated and
//!    update hooks run,
//! 4. [`get`](InfoGroup::get) / [`compare`](InfoGroup::compare) any number
//!    of times.
//!
//! # Example
//!
//! ```
//! use machinestate::group::{GroupArgs, InfoGroup};
//! use machinestate::parse::{to_float, to_int};
//! use machinestate::source::MockBackend;
//!
//! let mut backend = MockBackend::new();
//! backend.add_command("uptime", "", "up 2.5 days, 3 users");
//!
//! let mut group = InfoGroup::new("Uptime", &GroupArgs::default());
//! group.add_command("Days", "uptime", "", Some(r"up ([\d.]+) days"), Some(to_float)).unwrap();
//! group.add_command("Users", "uptime", "", Some(r"(\d+) users"), Some(to_int)).unwrap();
//! group.generate().unwrap();
//! group.update_with(&backend);
//!
//! assert_eq!(backend.command_runs("uptime", ""), 1);
//! assert_eq!(group.value("Days"), Some(&serde_json::json!(2.5)));
//! assert_eq!(group.value("Users"), Some(&serde_json::json!(3)));
//! ```

pub mod args;
pub mod compare;
pub mod discovery;
pub mod document;
pub mod meta;
pub mod registry;

pub use args::{ArgValue, GroupArgs, IDENT_KEY};
pub use compare::{
    values_match, CompareOptions, CompareTarget, Diff, Mismatch, Side, UnmatchedChild,
    DEFAULT_TOLERANCE,
};
pub use discovery::{path_identities, ChildSpec, Discovery};
pub use document::{render_json, sort_document, RenderOptions};
pub use meta::{encode_meta, parse_meta, META_KEY};
pub use registry::{GroupFactory, ProbeKind, ProbeRegistry};

use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use crate::anonymize::anonymize_value;
use crate::error::Result;
use crate::parse::Converter;
use crate::source::{Field, FieldPattern, SourceBackend, SourceCache, SystemBackend, ValueSource};

/// Kind name of groups built without a dedicated factory.
pub const GENERIC_KIND: &str = "InfoGroup";

/// Post-acquisition step run at the end of [`InfoGroup::update_with`].
///
/// Hooks see the group's freshly acquired data and its updated children.
/// They derive dynamic values or rename the group. The [`SourceCache`] is
/// the one used for the group's fields, so re-reading a field's source is
/// free.
pub type UpdateHook = fn(&mut InfoGroup, &mut SourceCache<'_>);

/// A named node holding fields and child groups.
#[derive(Debug, Clone)]
pub struct InfoGroup {
    name: String,
    kind: String,
    args: GroupArgs,
    fields: Vec<Field>,
    data: Map<String, Value>,
    children: Vec<InfoGroup>,
    discovery: Discovery,
    hooks: Vec<UpdateHook>,
}

impl InfoGroup {
    /// Create an empty group of the generic kind.
    pub fn new(name: impl Into<String>, args: &GroupArgs) -> Self {
        Self {
            name: name.into(),
            kind: GENERIC_KIND.to_string(),
            args: args.clone(),
            fields: Vec::new(),
            data: Map::new(),
            children: Vec::new(),
            discovery: Discovery::None,
            hooks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the group; the parent keys its output by the current name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn args(&self) -> &GroupArgs {
        &self.args
    }

    pub fn extended(&self) -> bool {
        self.args.extended
    }

    pub fn anonymous(&self) -> bool {
        self.args.anonymous
    }

    pub(crate) fn stamp(&mut self, kind: &str, args: GroupArgs) {
        self.kind = kind.to_string();
        self.args = args;
    }

    /// The metadata string embedded under [`META_KEY`].
    pub fn meta(&self) -> String {
        encode_meta(&self.kind, &self.args)
    }

    fn declare(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    fn declare_with(
        &mut self,
        key: &str,
        source: ValueSource,
        pattern: Option<&str>,
        converter: Option<Converter>,
    ) -> Result<()> {
        let mut field = Field::new(key, source);
        field.pattern = pattern.map(FieldPattern::new).transpose()?;
        field.converter = converter;
        self.declare(field);
        Ok(())
    }

    /// Declare a field with a fixed value.
    pub fn add_constant(&mut self, key: &str, value: impl Into<Value>) {
        self.declare(Field::new(key, ValueSource::Constant(value.into())));
    }

    /// Declare a field read from a file.
    pub fn add_file(
        &mut self,
        key: &str,
        path: impl Into<PathBuf>,
        pattern: Option<&str>,
        converter: Option<Converter>,
    ) -> Result<()> {
        self.declare_with(key, ValueSource::File(path.into()), pattern, converter)
    }

    /// Declare a field taken from a command's stdout.
    pub fn add_command(
        &mut self,
        key: &str,
        executable: &str,
        args: &str,
        pattern: Option<&str>,
        converter: Option<Converter>,
    ) -> Result<()> {
        self.declare_with(
            key,
            ValueSource::command(executable, args),
            pattern,
            converter,
        )
    }

    /// Mark fields as load-bearing for comparison.
    pub fn require(&mut self, keys: &[&str]) {
        self.flag_fields(keys, |field| field.required = true);
    }

    /// Mark fields as host- or user-identifying.
    pub fn mark_identifying(&mut self, keys: &[&str]) {
        self.flag_fields(keys, |field| field.identifying = true);
    }

    fn flag_fields(&mut self, keys: &[&str], set: impl Fn(&mut Field)) {
        for key in keys {
            match self.fields.iter_mut().find(|f| f.name == *key) {
                Some(field) => set(field),
                None => debug!(group = %self.name, field = *key, "flag on undeclared field"),
            }
        }
    }

    pub fn on_update(&mut self, hook: UpdateHook) {
        self.hooks.push(hook);
    }

    pub fn set_discovery(&mut self, discovery: Discovery) {
        self.discovery = discovery;
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Attach an already built child.
    pub fn push_child(&mut self, child: InfoGroup) {
        self.children.push(child);
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == key)
    }

    /// Names of the fields marked required, in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Values acquired by the last update, in declaration order.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Store a value directly, as hooks and reconstruction do.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn children(&self) -> &[InfoGroup] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [InfoGroup] {
        &mut self.children
    }

    pub fn child(&self, name: &str) -> Option<&InfoGroup> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Run discovery, recursively building the children.
    ///
    /// Groups without a discovery strategy keep their children and only
    /// regenerate them.
    pub fn generate(&mut self) -> Result<()> {
        match self.discovery.discover(&self.name)? {
            Some(children) => self.children = children,
            None => {
                for child in &mut self.children {
                    child.generate()?;
                }
            }
        }
        Ok(())
    }

    /// Acquire all values from the live system.
    pub fn update(&mut self) {
        self.update_with(&SystemBackend::new());
    }

    /// Acquire all values through `backend`.
    ///
    /// Each distinct file or command is resolved once per call, however
    /// many fields refer to it. Unavailable sources yield `null`; failed
    /// conversions keep the matched text. Nothing here aborts the pass.
    pub fn update_with(&mut self, backend: &dyn SourceBackend) {
        let mut cache = SourceCache::new(backend);
        let mut data = Map::new();

        for (index, field) in self.fields.iter().enumerate() {
            let raw = match &field.source {
                ValueSource::Constant(_) => None,
                source => cache.resolve(field.key(index), source),
            };
            let mut value = field.value_from(raw);
            if self.args.anonymous && field.identifying {
                value = anonymize_value(&value);
            }
            data.insert(field.name.clone(), value);
        }
        self.data = data;

        for child in &mut self.children {
            child.update_with(backend);
        }
        for hook in self.hooks.clone() {
            hook(self, &mut cache);
        }
    }
}
