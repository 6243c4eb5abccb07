//! Recursive schema-to-fragment conversion.
//!
//! [`convert`] walks a schema node tree, dispatches each node to the
//! converter for its type tag, and lifts nodes named via `className`
//! metadata into a shared definitions registry referenced with `$ref`.

use serde_json::{Map, Value};
use tracing::trace;

use crate::node::{Child, NodeType, SchemaNode};
use crate::types;

/// A JSON-serializable output fragment.
pub type Fragment = Map<String, Value>;

/// Named fragments discovered during one conversion, keyed by class name.
pub type Definitions = Map<String, Value>;

/// Successful conversion result: the fragment for the root node plus every
/// named definition discovered while walking it.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub fragment: Fragment,
    pub definitions: Definitions,
}

/// Fatal conversion failures. None of these are recovered internally and no
/// partial output is produced.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no schema was given")]
    MissingInput,
    #[error("input does not describe a schema node: {0}")]
    InvalidSchema(String),
    #[error("`{0}` is not a supported schema type")]
    UnsupportedType(String),
    #[error("array schema defines no items schema at index {0}")]
    MissingItemsSchema(usize),
}

/// Internal resolution of one node.
///
/// `required` is the transient marker set by the alternatives converter when
/// the selected branch is required; the enclosing object converter consumes
/// it. It is never written into the fragment itself.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub fragment: Fragment,
    pub definitions: Definitions,
    pub required: bool,
}

/// Converts a schema node (or a plain mapping of name to node) into an
/// output fragment and the definitions it references.
///
/// Returns `Ok(None)` when the root node itself is forbidden.
pub fn convert(input: &Value) -> Result<Option<Converted>, ConvertError> {
    convert_with_definitions(input, &Definitions::new())
}

/// Like [`convert`], but resolves `className` references against an existing
/// definitions map first. Names already present are never re-expanded; they
/// resolve to a `$ref` and contribute no new definitions.
pub fn convert_with_definitions(
    input: &Value,
    existing: &Definitions,
) -> Result<Option<Converted>, ConvertError> {
    let node = normalize_input(input)?;

    Ok(convert_node(&node, existing)?.map(|resolved| Converted {
        fragment: resolved.fragment,
        definitions: resolved.definitions,
    }))
}

/// `{ "$ref": "#/definitions/<name>" }`
pub fn ref_fragment(name: &str) -> Fragment {
    let mut fragment = Fragment::new();
    fragment.insert(
        "$ref".to_string(),
        Value::String(format!("#/definitions/{name}")),
    );
    fragment
}

/// Reads the raw input as a schema node, treating a plain mapping of
/// name to node as sugar for an implicit object schema.
fn normalize_input(input: &Value) -> Result<SchemaNode, ConvertError> {
    let map = match input {
        Value::Null => return Err(ConvertError::MissingInput),
        Value::Object(map) => map,
        other => {
            return Err(ConvertError::InvalidSchema(format!(
                "expected an object, got {}",
                json_kind(other)
            )));
        }
    };

    if map.get("type").is_some_and(Value::is_string) {
        return serde_json::from_value(input.clone())
            .map_err(|err| ConvertError::InvalidSchema(err.to_string()));
    }

    let mut children = Vec::with_capacity(map.len());
    for (key, value) in map {
        if !value.get("type").is_some_and(Value::is_string) {
            return Err(ConvertError::InvalidSchema(format!(
                "`{key}` is not a schema node"
            )));
        }
        let schema = serde_json::from_value(value.clone())
            .map_err(|err| ConvertError::InvalidSchema(err.to_string()))?;
        children.push(Child {
            key: key.clone(),
            schema,
        });
    }

    Ok(SchemaNode::object(children))
}

pub(crate) fn convert_node(
    node: &SchemaNode,
    existing: &Definitions,
) -> Result<Option<Resolved>, ConvertError> {
    let override_fragment = node.meta("swagger").and_then(Value::as_object);

    if let Some(fragment) = override_fragment {
        if node.meta("swaggerOverride").is_some_and(is_truthy) {
            // Full replacement: the override stands in for the whole node.
            return Ok(Some(Resolved {
                fragment: fragment.clone(),
                definitions: Definitions::new(),
                required: false,
            }));
        }
    }

    let class_name = node.meta_str("className");

    if let Some(name) = class_name {
        if existing.contains_key(name) {
            return Ok(Some(Resolved {
                fragment: ref_fragment(name),
                definitions: Definitions::new(),
                required: false,
            }));
        }
    }

    let mut definitions = Definitions::new();
    let mut required = false;

    let fragment = match &node.kind {
        NodeType::Number => Some(types::number(node)),
        NodeType::String => types::string(node),
        NodeType::Binary => types::binary(node),
        NodeType::Date => types::date(node),
        NodeType::Boolean => types::boolean(node),
        NodeType::Array => types::array(node, existing, &mut definitions)?,
        NodeType::Object => Some(types::object(node, existing, &mut definitions)?),
        NodeType::Alternatives => {
            match types::alternatives(node, existing, &mut definitions)? {
                Some((fragment, branch_required)) => {
                    required = branch_required;
                    Some(fragment)
                }
                None => None,
            }
        }
        NodeType::Other(tag) => return Err(ConvertError::UnsupportedType(tag.clone())),
    };

    let Some(mut fragment) = fragment else {
        // The converter signalled a forbidden node; the parent omits it.
        return Ok(None);
    };

    if let Some(description) = &node.description {
        fragment.insert(
            "description".to_string(),
            Value::String(description.clone()),
        );
    }

    if let Some(default) = &node.flags.default {
        if is_truthy(default) {
            fragment.insert("default".to_string(), default.clone());
        }
    }

    if let Some(name) = class_name {
        trace!(definition = name, "registering definition");
        definitions.insert(name.to_string(), Value::Object(fragment));

        return Ok(Some(Resolved {
            fragment: ref_fragment(name),
            definitions,
            required,
        }));
    }

    if let Some(override_fragment) = override_fragment {
        for (key, value) in override_fragment {
            fragment.insert(key.clone(), value.clone());
        }
    }

    // Top-level forbidden check, in addition to the per-type ones. Some
    // types (number, object) have no converter-level check and rely on this.
    if node.is_forbidden() {
        return Ok(None);
    }

    trace!(kind = ?node.kind, "converted node");

    Ok(Some(Resolved {
        fragment,
        definitions,
        required,
    }))
}

/// Source-language truthiness, used for the override flag and the
/// default-value flag.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_input_is_missing() {
        assert!(matches!(
            convert(&Value::Null),
            Err(ConvertError::MissingInput)
        ));
    }

    #[test]
    fn non_object_input_is_invalid() {
        assert!(matches!(
            convert(&json!(42)),
            Err(ConvertError::InvalidSchema(_))
        ));
    }

    #[test]
    fn plain_mapping_becomes_object_schema() {
        let input = json!({
            "name": { "type": "string" },
            "age": { "type": "number", "tests": [{ "name": "integer" }] }
        });

        let converted = convert(&input).unwrap().unwrap();
        assert_eq!(converted.fragment["type"], "object");
        assert_eq!(
            converted.fragment["properties"],
            json!({
                "name": { "type": "string" },
                "age": { "type": "integer" }
            })
        );
    }

    #[test]
    fn mapping_with_non_node_value_is_invalid() {
        let input = json!({ "name": "not a schema" });
        assert!(matches!(
            convert(&input),
            Err(ConvertError::InvalidSchema(_))
        ));
    }

    #[test]
    fn unsupported_type_is_an_error() {
        let err = convert(&json!({ "type": "func" })).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedType(ref tag) if tag == "func"));
        assert_eq!(err.to_string(), "`func` is not a supported schema type");
    }

    #[test]
    fn override_replaces_node_entirely() {
        let input = json!({
            "type": "string",
            "tests": [{ "name": "email" }],
            "metas": [{
                "swagger": { "type": "string", "x-custom": true },
                "swaggerOverride": true
            }]
        });

        let converted = convert(&input).unwrap().unwrap();
        assert_eq!(
            Value::Object(converted.fragment),
            json!({ "type": "string", "x-custom": true })
        );
        assert!(converted.definitions.is_empty());
    }

    #[test]
    fn override_without_flag_is_merged() {
        let input = json!({
            "type": "string",
            "metas": [{ "swagger": { "x-extra": 1 } }]
        });

        let converted = convert(&input).unwrap().unwrap();
        assert_eq!(
            Value::Object(converted.fragment),
            json!({ "type": "string", "x-extra": 1 })
        );
    }

    #[test]
    fn existing_definition_short_circuits() {
        let mut existing = Definitions::new();
        existing.insert("Email".to_string(), json!({ "type": "string" }));

        let input = json!({
            "type": "string",
            "metas": [{ "className": "Email" }]
        });

        let converted = convert_with_definitions(&input, &existing)
            .unwrap()
            .unwrap();
        assert_eq!(
            Value::Object(converted.fragment),
            json!({ "$ref": "#/definitions/Email" })
        );
        assert!(converted.definitions.is_empty());
    }

    #[test]
    fn description_and_default_are_attached() {
        let input = json!({
            "type": "string",
            "description": "a name",
            "flags": { "default": "salak" }
        });

        let converted = convert(&input).unwrap().unwrap();
        assert_eq!(
            Value::Object(converted.fragment),
            json!({ "type": "string", "description": "a name", "default": "salak" })
        );
    }

    #[test]
    fn falsy_default_is_not_attached() {
        let input = json!({
            "type": "string",
            "flags": { "default": "" }
        });

        let converted = convert(&input).unwrap().unwrap();
        assert_eq!(Value::Object(converted.fragment), json!({ "type": "string" }));
    }

    #[test]
    fn forbidden_root_yields_none() {
        let input = json!({
            "type": "boolean",
            "flags": { "presence": "forbidden" }
        });

        assert!(convert(&input).unwrap().is_none());
    }

    #[test]
    fn forbidden_number_is_suppressed_by_dispatcher() {
        // The number converter has no forbidden check of its own.
        let input = json!({
            "type": "number",
            "flags": { "presence": "forbidden" }
        });

        assert!(convert(&input).unwrap().is_none());
    }
}
