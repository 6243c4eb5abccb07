//! Validation schema node model.
//!
//! A [`SchemaNode`] is the serialized description of a validation schema as
//! produced by the validation library. This crate only reads nodes; it never
//! constructs them except for the implicit-object input sugar.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Type tag of a schema node.
///
/// Tags without a converter (`any`, `func`, ...) deserialize as [`Other`]
/// and surface as an unsupported-type error at dispatch time.
///
/// [`Other`]: NodeType::Other
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NodeType {
    Number,
    String,
    Binary,
    Date,
    Boolean,
    Array,
    Object,
    Alternatives,
    Other(String),
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "number" => NodeType::Number,
            "string" => NodeType::String,
            "binary" => NodeType::Binary,
            "date" => NodeType::Date,
            "boolean" => NodeType::Boolean,
            "array" => NodeType::Array,
            "object" => NodeType::Object,
            "alternatives" => NodeType::Alternatives,
            _ => NodeType::Other(tag),
        }
    }
}

/// Presence marking on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Optional,
    Required,
    Forbidden,
}

/// A named constraint recorded on a node, with an optional argument.
#[derive(Debug, Clone, Deserialize)]
pub struct Test {
    pub name: String,
    #[serde(default)]
    pub arg: Option<Value>,
}

impl Test {
    /// Source text of a regex argument, given either directly as a string or
    /// under a `pattern` key.
    pub fn pattern_arg(&self) -> Option<&str> {
        let arg = self.arg.as_ref()?;
        arg.get("pattern")
            .and_then(Value::as_str)
            .or_else(|| arg.as_str())
    }
}

/// Boolean and value flags set on a node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Flags {
    pub presence: Option<Presence>,
    pub default: Option<Value>,
    pub encoding: Option<String>,
    #[serde(rename = "allowOnly")]
    pub allow_only: bool,
    #[serde(rename = "allowUnknown")]
    pub allow_unknown: Option<bool>,
}

/// Per-node validation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub convert: Option<bool>,
}

/// One conditional branch of an alternatives node.
///
/// Reference-based conditionals carry `then`/`otherwise`; plain match lists
/// carry `schema`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Match {
    #[serde(rename = "ref")]
    pub reference: Option<Value>,
    pub schema: Option<SchemaNode>,
    pub then: Option<SchemaNode>,
    pub otherwise: Option<SchemaNode>,
}

/// Named child of an object node. Declared order is meaningful.
#[derive(Debug, Clone, Deserialize)]
pub struct Child {
    pub key: String,
    pub schema: SchemaNode,
}

/// Type-specific substructure: children for objects, items for arrays,
/// matches for alternatives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Inner {
    pub children: Vec<Child>,
    pub items: Vec<SchemaNode>,
    pub matches: Vec<Match>,
}

/// A validation schema node.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub tests: Vec<Test>,
    #[serde(default)]
    pub flags: Flags,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub valids: Vec<Value>,
    #[serde(default)]
    pub metas: Vec<Map<String, Value>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inner: Inner,
}

impl SchemaNode {
    /// An object node wrapping the given children. Used when the caller
    /// passes a plain mapping of name to schema node.
    pub fn object(children: Vec<Child>) -> Self {
        SchemaNode {
            kind: NodeType::Object,
            tests: Vec::new(),
            flags: Flags::default(),
            settings: Settings::default(),
            valids: Vec::new(),
            metas: Vec::new(),
            description: None,
            inner: Inner {
                children,
                ..Inner::default()
            },
        }
    }

    /// Looks up `key` in the merged metadata annotations. Later annotations
    /// override earlier ones on key collision.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metas.iter().rev().find_map(|meta| meta.get(key))
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta(key).and_then(Value::as_str)
    }

    /// Numeric metadata lookup, defaulting to 0. Used for branch and item
    /// index selection.
    pub fn meta_index(&self, key: &str) -> usize {
        self.meta(key).and_then(Value::as_u64).unwrap_or(0) as usize
    }

    /// First test with the given name, in declared order.
    pub fn test(&self, name: &str) -> Option<&Test> {
        self.tests.iter().find(|test| test.name == name)
    }

    pub fn has_test(&self, name: &str) -> bool {
        self.test(name).is_some()
    }

    /// Whether the node's presence marking is `forbidden`.
    pub fn is_forbidden(&self) -> bool {
        self.flags.presence == Some(Presence::Forbidden)
    }

    pub fn is_required(&self) -> bool {
        self.flags.presence == Some(Presence::Required)
    }

    /// Strict mode: value coercion disabled on this node.
    pub fn is_strict(&self) -> bool {
        self.settings.convert == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> SchemaNode {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn later_meta_overrides_earlier() {
        let n = node(json!({
            "type": "string",
            "metas": [
                { "swaggerIndex": 0, "className": "First" },
                { "swaggerIndex": 2 }
            ]
        }));

        assert_eq!(n.meta_index("swaggerIndex"), 2);
        assert_eq!(n.meta_str("className"), Some("First"));
        assert_eq!(n.meta("missing"), None);
    }

    #[test]
    fn unknown_type_tag_is_preserved() {
        let n = node(json!({ "type": "func" }));
        assert_eq!(n.kind, NodeType::Other("func".to_string()));
    }

    #[test]
    fn presence_flags() {
        let n = node(json!({
            "type": "string",
            "flags": { "presence": "forbidden" }
        }));
        assert!(n.is_forbidden());
        assert!(!n.is_required());
    }

    #[test]
    fn regex_arg_shapes() {
        let direct = node(json!({
            "type": "string",
            "tests": [{ "name": "regex", "arg": "^a+$" }]
        }));
        assert_eq!(direct.test("regex").unwrap().pattern_arg(), Some("^a+$"));

        let wrapped = node(json!({
            "type": "string",
            "tests": [{ "name": "regex", "arg": { "pattern": "^b+$" } }]
        }));
        assert_eq!(wrapped.test("regex").unwrap().pattern_arg(), Some("^b+$"));
    }
}
