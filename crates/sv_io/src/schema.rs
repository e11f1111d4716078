//! Embedded JSON Schemas and validation (Draft-07).

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::{IoError, IoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Dataset,
    Members,
}

const DATASET_SCHEMA_JSON: &str = include_str!("../schemas/dataset.schema.json");

/// Members upload: a bare array of member entries.
const MEMBERS_SCHEMA_JSON: &str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "array",
  "items": {
    "type": "object",
    "additionalProperties": false,
    "required": ["first_name", "last_name"],
    "properties": {
      "member_id": { "oneOf": [ { "type": "integer", "minimum": 1 }, { "type": "null" } ] },
      "first_name": { "type": "string" },
      "last_name": { "type": "string" }
    }
  }
}"##;

fn schema_source(kind: SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Dataset => DATASET_SCHEMA_JSON,
        SchemaKind::Members => MEMBERS_SCHEMA_JSON,
    }
}

/// Validate `instance` against the embedded schema; the first violation is
/// reported with its JSON Pointer.
pub fn validate_value(kind: SchemaKind, instance: &Value) -> IoResult<()> {
    let schema: Value = serde_json::from_str(schema_source(kind))
        .map_err(|e| IoError::Schema { pointer: "/".into(), msg: format!("embedded {kind:?} schema: {e}") })?;
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .map_err(|e| IoError::Schema { pointer: "/".into(), msg: format!("schema compile error: {e}") })?;

    let first = match compiled.validate(instance) {
        Ok(()) => return Ok(()),
        Err(mut errors) => errors.next().map(|err| (err.instance_path.to_string(), err.to_string())),
    };
    let (pointer, msg) = first.unwrap_or_else(|| ("/".into(), "instance rejected".into()));
    Err(IoError::Schema {
        pointer: if pointer.is_empty() { "/".into() } else { pointer },
        msg,
    })
}
