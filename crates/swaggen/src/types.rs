//! Per-type converters from schema nodes to output fragments.
//!
//! Each converter maps one node type's tests and flags onto output fields.
//! `None` means the node is forbidden and must be omitted by the caller, not
//! an error. The recursive converters (array, object, alternatives) merge
//! every definition they discover into the accumulator they were given and
//! resolve nested nodes against the union of existing and accumulated
//! definitions, so sibling nodes share one registry.

use serde_json::Value;

use crate::convert::{ConvertError, Definitions, Fragment, convert_node};
use crate::node::SchemaNode;

const ALPHANUM: &str = "^[a-zA-Z0-9]*$";
const ALPHANUM_LOWER: &str = "^[a-z0-9]*$";
const ALPHANUM_UPPER: &str = "^[A-Z0-9]*$";

pub(crate) fn number(node: &SchemaNode) -> Fragment {
    let mut fragment = Fragment::new();

    if node.has_test("integer") {
        fragment.insert("type".to_string(), "integer".into());
    } else {
        fragment.insert("type".to_string(), "number".into());
        let format = if node.has_test("precision") {
            "double"
        } else {
            "float"
        };
        fragment.insert("format".to_string(), format.into());
    }

    if node.has_test("positive") {
        fragment.insert("minimum".to_string(), 1.into());
    }
    if node.has_test("negative") {
        fragment.insert("maximum".to_string(), (-1).into());
    }

    // Explicit bounds override the positive/negative shorthands.
    if let Some(arg) = node.test("min").and_then(|test| test.arg.as_ref()) {
        fragment.insert("minimum".to_string(), arg.clone());
    }
    if let Some(arg) = node.test("max").and_then(|test| test.arg.as_ref()) {
        fragment.insert("maximum".to_string(), arg.clone());
    }

    insert_enum(node, &mut fragment, Value::is_number);

    fragment
}

pub(crate) fn string(node: &SchemaNode) -> Option<Fragment> {
    if node.is_forbidden() {
        return None;
    }

    let mut fragment = Fragment::new();
    fragment.insert("type".to_string(), "string".into());

    // Pattern precedence: alphanum, then token, then an explicit regex;
    // email/isoDate come last and clear any pattern in favor of a format.
    if node.has_test("alphanum") {
        let strict = node.is_strict();
        let pattern = if strict && node.has_test("lowercase") {
            ALPHANUM_LOWER
        } else if strict && node.has_test("uppercase") {
            ALPHANUM_UPPER
        } else {
            ALPHANUM
        };
        fragment.insert("pattern".to_string(), pattern.into());
    }

    if node.has_test("token") {
        // Token selects the case variant regardless of strict mode.
        let pattern = if node.has_test("lowercase") {
            ALPHANUM_LOWER
        } else if node.has_test("uppercase") {
            ALPHANUM_UPPER
        } else {
            ALPHANUM
        };
        fragment.insert("pattern".to_string(), pattern.into());
    }

    if let Some(pattern) = node.test("regex").and_then(|test| test.pattern_arg()) {
        fragment.insert("pattern".to_string(), pattern.into());
    }

    if node.has_test("email") {
        fragment.insert("format".to_string(), "email".into());
        fragment.remove("pattern");
    }

    if node.has_test("isoDate") {
        fragment.insert("format".to_string(), "date-time".into());
        fragment.remove("pattern");
    }

    apply_length_tests(node, &mut fragment, "minLength", "maxLength");
    insert_enum(node, &mut fragment, Value::is_string);

    Some(fragment)
}

pub(crate) fn binary(node: &SchemaNode) -> Option<Fragment> {
    if node.is_forbidden() {
        return None;
    }

    let mut fragment = Fragment::new();
    fragment.insert("type".to_string(), "string".into());

    let format = if node.flags.encoding.as_deref() == Some("base64") {
        "byte"
    } else {
        "binary"
    };
    fragment.insert("format".to_string(), format.into());

    apply_length_tests(node, &mut fragment, "minLength", "maxLength");

    Some(fragment)
}

pub(crate) fn date(node: &SchemaNode) -> Option<Fragment> {
    if node.is_forbidden() {
        return None;
    }

    let mut fragment = Fragment::new();
    fragment.insert("type".to_string(), "string".into());
    fragment.insert("format".to_string(), "date-time".into());
    Some(fragment)
}

pub(crate) fn boolean(node: &SchemaNode) -> Option<Fragment> {
    if node.is_forbidden() {
        return None;
    }

    let mut fragment = Fragment::new();
    fragment.insert("type".to_string(), "boolean".into());
    Some(fragment)
}

pub(crate) fn array(
    node: &SchemaNode,
    existing: &Definitions,
    definitions: &mut Definitions,
) -> Result<Option<Fragment>, ConvertError> {
    let index = node.meta_index("swaggerIndex");
    let Some(item) = node.inner.items.get(index) else {
        return Err(ConvertError::MissingItemsSchema(index));
    };

    if node.is_forbidden() {
        return Ok(None);
    }

    let resolved = convert_node(item, &combined(existing, definitions))?;

    let mut fragment = Fragment::new();
    fragment.insert("type".to_string(), "array".into());
    apply_length_tests(node, &mut fragment, "minItems", "maxItems");

    if node.has_test("unique") {
        fragment.insert("uniqueItems".to_string(), true.into());
    }

    // A forbidden item schema simply leaves `items` out.
    if let Some(item) = resolved {
        merge_definitions(definitions, item.definitions);
        fragment.insert("items".to_string(), Value::Object(item.fragment));
    }

    Ok(Some(fragment))
}

pub(crate) fn object(
    node: &SchemaNode,
    existing: &Definitions,
    definitions: &mut Definitions,
) -> Result<Fragment, ConvertError> {
    let mut properties = Fragment::new();
    let mut required = Vec::new();

    let mut known = combined(existing, definitions);

    for child in &node.inner.children {
        let Some(resolved) = convert_node(&child.schema, &known)? else {
            // Forbidden children are omitted from properties and required.
            continue;
        };

        for (name, definition) in resolved.definitions {
            known
                .entry(name.clone())
                .or_insert_with(|| definition.clone());
            definitions.entry(name).or_insert(definition);
        }

        if child.schema.is_required() || resolved.required {
            required.push(Value::String(child.key.clone()));
        }

        properties.insert(child.key.clone(), Value::Object(resolved.fragment));
    }

    let mut fragment = Fragment::new();
    fragment.insert("type".to_string(), "object".into());
    fragment.insert("properties".to_string(), Value::Object(properties));

    if !required.is_empty() {
        fragment.insert("required".to_string(), Value::Array(required));
    }

    if node.flags.allow_unknown == Some(false) {
        fragment.insert("additionalProperties".to_string(), false.into());
    }

    Ok(fragment)
}

/// Converts the branch selected by the `swaggerIndex` metadata (default 0).
///
/// The second element of the returned pair is the transient required marker:
/// true when the selected branch's presence flag is `required`. The enclosing
/// object converter uses it to list the property as required.
pub(crate) fn alternatives(
    node: &SchemaNode,
    existing: &Definitions,
    definitions: &mut Definitions,
) -> Result<Option<(Fragment, bool)>, ConvertError> {
    let index = node.meta_index("swaggerIndex");
    let matches = &node.inner.matches;

    let branch = match matches.first() {
        Some(first) if first.reference.is_some() => {
            if index == 0 {
                first.then.as_ref()
            } else {
                first.otherwise.as_ref()
            }
        }
        Some(_) if index != 0 => matches.get(index).and_then(|m| m.schema.as_ref()),
        Some(first) => first.schema.as_ref(),
        None => None,
    };
    // Recursing with no branch schema is the same failure as being handed no
    // schema at the top level.
    let branch = branch.ok_or(ConvertError::MissingInput)?;

    let required = branch.is_required();

    let Some(resolved) = convert_node(branch, &combined(existing, definitions))? else {
        return Ok(None);
    };

    merge_definitions(definitions, resolved.definitions);

    Ok(Some((resolved.fragment, required)))
}

/// Union of already-known and newly-accumulated definitions, for resolving
/// nested nodes.
fn combined(existing: &Definitions, discovered: &Definitions) -> Definitions {
    let mut combined = existing.clone();
    for (name, definition) in discovered {
        combined
            .entry(name.clone())
            .or_insert_with(|| definition.clone());
    }
    combined
}

/// Never overwrites: a name collision reuses the existing entry.
fn merge_definitions(target: &mut Definitions, source: Definitions) {
    for (name, definition) in source {
        target.entry(name).or_insert(definition);
    }
}

/// Shared min/max/length rule for string and binary lengths and array item
/// counts. Tests apply strictly in declared order, last write wins per
/// bound; `length` writes both bounds.
fn apply_length_tests(node: &SchemaNode, fragment: &mut Fragment, min_key: &str, max_key: &str) {
    for test in &node.tests {
        let Some(arg) = &test.arg else { continue };
        match test.name.as_str() {
            "min" => {
                fragment.insert(min_key.to_string(), arg.clone());
            }
            "max" => {
                fragment.insert(max_key.to_string(), arg.clone());
            }
            "length" => {
                fragment.insert(min_key.to_string(), arg.clone());
                fragment.insert(max_key.to_string(), arg.clone());
            }
            _ => {}
        }
    }
}

/// Emits `enum` from the allowed literals when the allow-only flag is set,
/// filtered to values of the node's runtime type.
fn insert_enum(node: &SchemaNode, fragment: &mut Fragment, keep: fn(&Value) -> bool) {
    if !node.flags.allow_only {
        return;
    }

    let valids: Vec<Value> = node.valids.iter().filter(|v| keep(v)).cloned().collect();
    if !valids.is_empty() {
        fragment.insert("enum".to_string(), Value::Array(valids));
    }
}
