//! Rendering a tree to a JSON document and rebuilding it from one.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use super::meta::{parse_meta, META_KEY};
use super::registry::ProbeRegistry;
use super::InfoGroup;
use crate::error::{MachineStateError, Result};

/// Longest document excerpt quoted in reconstruction errors.
const FRAGMENT_CHARS: usize = 160;

/// How a tree is rendered to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Embed the reserved metadata key in every group.
    pub meta: bool,
    /// Sort keys alphabetically at every level.
    pub sort: bool,
    /// Spaces per indentation level; 0 renders compact JSON.
    pub indent: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            meta: true,
            sort: false,
            indent: 4,
        }
    }
}

impl InfoGroup {
    /// Render the tree to an ordered mapping.
    ///
    /// Local fields come first in declaration order, then one entry per
    /// child keyed by its current name. With `meta`, every group also
    /// carries [`META_KEY`].
    pub fn get(&self, meta: bool) -> Value {
        let mut out = Map::new();
        if meta {
            out.insert(META_KEY.to_string(), Value::String(self.meta()));
        }
        for (key, value) in &self.data {
            out.insert(key.clone(), value.clone());
        }
        for child in &self.children {
            out.insert(child.name.clone(), child.get(meta));
        }
        Value::Object(out)
    }

    /// Render the tree to JSON text.
    pub fn to_json(&self, options: &RenderOptions) -> Result<String> {
        let mut document = self.get(options.meta);
        if options.sort {
            document = sort_document(&document);
        }
        render_json(&document, options.indent)
    }

    /// Rebuild a tree from a document produced with metadata.
    ///
    /// The top-level mapping must carry [`META_KEY`]; its kind is looked up
    /// in `registry` and built with the decoded arguments. Every other key
    /// whose value is a metadata-bearing mapping becomes a child named by
    /// that key; anything else is stored as an acquired value. The result
    /// can be rendered and compared but is not meant to be updated.
    pub fn from_document(document: &Value, registry: &ProbeRegistry) -> Result<InfoGroup> {
        let map = document
            .as_object()
            .ok_or_else(|| reconstruction(document, "document is not a mapping"))?;
        if map.is_empty() {
            return Err(reconstruction(document, "document is empty"));
        }
        let meta = match map.get(META_KEY) {
            Some(Value::String(meta)) => meta,
            Some(_) => return Err(reconstruction(document, "metadata is not a string")),
            None => {
                return Err(reconstruction(
                    document,
                    &format!("missing '{META_KEY}' key; document was written without metadata"),
                ))
            }
        };

        let (kind_name, args) = parse_meta(meta)?;
        let kind = registry.lookup(&kind_name).map_err(|e| MachineStateError::Reconstruction {
            fragment: meta.clone(),
            message: e.to_string(),
        })?;
        let mut group = kind.build(&args).map_err(|e| MachineStateError::Reconstruction {
            fragment: meta.clone(),
            message: e.to_string(),
        })?;
        group.data.clear();
        group.children.clear();

        for (key, value) in map {
            if key == META_KEY {
                continue;
            }
            match value {
                Value::Object(inner) if inner.contains_key(META_KEY) => {
                    let mut child = InfoGroup::from_document(value, registry)?;
                    child.set_name(key.clone());
                    group.children.push(child);
                }
                _ => {
                    group.data.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(group)
    }

    /// Parse JSON text and rebuild a tree from it.
    pub fn from_json(text: &str, registry: &ProbeRegistry) -> Result<InfoGroup> {
        let document: Value = serde_json::from_str(text)?;
        InfoGroup::from_document(&document, registry)
    }
}

fn reconstruction(document: &Value, message: &str) -> MachineStateError {
    let text = document.to_string();
    let fragment = if text.chars().count() > FRAGMENT_CHARS {
        let head: String = text.chars().take(FRAGMENT_CHARS).collect();
        format!("{head}...")
    } else {
        text
    };
    MachineStateError::Reconstruction {
        fragment,
        message: message.to_string(),
    }
}

/// Copy of `document` with object keys sorted at every level.
pub fn sort_document(document: &Value) -> Value {
    match document {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_document(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_document).collect()),
        other => other.clone(),
    }
}

/// Serialize with `indent` spaces per level, or compact when 0.
pub fn render_json(document: &Value, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(document)?);
    }
    let indent = vec![b' '; indent];
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(&indent));
    document.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|e| MachineStateError::Other(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::registry::ProbeKind;
    use crate::group::{ArgValue, Discovery, GroupArgs, IDENT_KEY};
    use crate::source::MockBackend;
    use serde_json::json;

    fn core_group(args: &GroupArgs) -> Result<InfoGroup> {
        let mut group = InfoGroup::new(format!("Core{}", args.int(IDENT_KEY)?), args);
        group.add_file("Freq", format!("/cpu{}/freq", args.int(IDENT_KEY)?), None, None)?;
        group.require(&["Freq"]);
        Ok(group)
    }

    fn socket_group(args: &GroupArgs) -> Result<InfoGroup> {
        let mut group = InfoGroup::new("Socket", args);
        group.add_constant("Vendor", "Acme");
        group.set_discovery(Discovery::list(
            vec![ArgValue::Int(0), ArgValue::Int(1)],
            CORE,
            args.inherit(),
        ));
        Ok(group)
    }

    const CORE: ProbeKind = ProbeKind::new("Core", core_group);
    const SOCKET: ProbeKind = ProbeKind::new("Socket", socket_group);

    fn registry() -> ProbeRegistry {
        ProbeRegistry::empty().with(CORE).with(SOCKET)
    }

    fn socket_tree() -> InfoGroup {
        let mut backend = MockBackend::new();
        backend.add_file("/cpu0/freq", "2400000");
        let mut tree = SOCKET.build(&GroupArgs::new(true, false)).unwrap();
        tree.generate().unwrap();
        tree.update_with(&backend);
        tree
    }

    #[test]
    fn get_orders_fields_before_children() {
        let tree = socket_tree();
        assert_eq!(
            tree.get(false),
            json!({
                "Vendor": "Acme",
                "Core0": {"Freq": "2400000"},
                "Core1": {"Freq": null},
            })
        );
        let document = tree.get(false);
        let keys: Vec<&String> = document.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["Vendor", "Core0", "Core1"]);
    }

    #[test]
    fn get_with_meta_describes_every_group() {
        let document = socket_tree().get(true);
        assert_eq!(document[META_KEY], json!("Socket(extended=true)"));
        assert_eq!(
            document["Core1"][META_KEY],
            json!("Core(extended=true, ident=1)")
        );
    }

    #[test]
    fn round_trip_reproduces_document() {
        let tree = socket_tree();
        let rebuilt = InfoGroup::from_document(&tree.get(true), &registry()).unwrap();
        assert_eq!(rebuilt.get(false), tree.get(false));
        assert_eq!(rebuilt.get(true), tree.get(true));
        assert_eq!(rebuilt.child("Core0").unwrap().kind(), "Core");
    }

    #[test]
    fn reconstruction_uses_current_child_names() {
        let mut tree = socket_tree();
        tree.children_mut()[0].set_name("Renamed");
        let rebuilt = InfoGroup::from_document(&tree.get(true), &registry()).unwrap();
        assert!(rebuilt.child("Renamed").is_some());
        assert!(rebuilt.child("Core0").is_none());
    }

    #[test]
    fn missing_meta_fails_fast() {
        let err = InfoGroup::from_document(&socket_tree().get(false), &registry()).unwrap_err();
        match err {
            MachineStateError::Reconstruction { fragment, message } => {
                assert!(fragment.contains("Vendor"));
                assert!(message.contains(META_KEY));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_and_non_object_documents_fail() {
        assert!(InfoGroup::from_document(&json!({}), &registry()).is_err());
        assert!(InfoGroup::from_document(&json!([1, 2]), &registry()).is_err());
    }

    #[test]
    fn unknown_kind_fails() {
        let err = InfoGroup::from_document(&json!({"_meta": "Gpu()"}), &registry()).unwrap_err();
        assert!(err.to_string().contains("Gpu"));
    }

    #[test]
    fn to_json_sorts_and_indents() {
        let mut group = InfoGroup::new("Test", &GroupArgs::default());
        group.add_constant("b", 1);
        group.add_constant("a", 2);
        group.update_with(&MockBackend::new());

        let options = RenderOptions {
            meta: false,
            sort: true,
            indent: 2,
        };
        assert_eq!(group.to_json(&options).unwrap(), "{\n  \"a\": 2,\n  \"b\": 1\n}");

        let compact = RenderOptions {
            meta: false,
            sort: false,
            indent: 0,
        };
        assert_eq!(group.to_json(&compact).unwrap(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn sort_document_recurses_into_lists() {
        let sorted = sort_document(&json!([{"z": 1, "a": {"y": 2, "b": 3}}]));
        assert_eq!(render_json(&sorted, 0).unwrap(), r#"[{"a":{"b":3,"y":2},"z":1}]"#);
    }
}
