//! Swagger definition generation from validation schemas.
//!
//! `swaggen` converts a validation-schema description (shape, type, and
//! constraint rules) into the equivalent Swagger/JSON-Schema fragment, and
//! collects named sub-schemas into a reusable definitions registry.
//!
//! # Architecture
//!
//! ```text
//! Schema node            Dispatcher              Output
//! ───────────────     ───────────────     ───────────────────
//! type tag        ──> convert_node   ──┬─> fragment ({"type": ...})
//! tests, flags        │  per-type      └─> definitions ({"Name": ...},
//! metadata            │  converters            referenced via $ref)
//! children/items  <───┘  (recursive)
//! ```
//!
//! The dispatcher resolves metadata overrides and memoized `$ref`s first,
//! then hands the node to the converter for its type. Converters for nested
//! types (object, array, alternatives) call back into the dispatcher and
//! thread one shared definitions accumulator through the whole walk.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "inner": { "children": [
//!         { "key": "id", "schema": {
//!             "type": "number",
//!             "tests": [{ "name": "integer" }],
//!             "flags": { "presence": "required" }
//!         }},
//!         { "key": "name", "schema": { "type": "string" } }
//!     ]}
//! });
//!
//! let converted = swaggen::convert(&schema).unwrap().expect("not forbidden");
//! assert_eq!(converted.fragment["type"], "object");
//! assert_eq!(converted.fragment["required"], json!(["id"]));
//! ```
//!
//! A forbidden node converts to `Ok(None)`: omission is a signal for the
//! enclosing schema, not an error. Unsupported node types are a hard error.

mod convert;
pub mod node;
mod types;

pub use convert::{
    ConvertError, Converted, Definitions, Fragment, convert, convert_with_definitions,
    ref_fragment,
};
