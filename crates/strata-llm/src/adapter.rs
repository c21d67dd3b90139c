//! # Schema Adapter
//!
//! Turns one [`Schema`] into the artifacts each vendor understands:
//!
//! - a strict JSON schema (`OpenAI`, Mistral, Ollama, and the Anthropic tool input)
//! - the `OpenAPI` subset Gemini takes as `responseSchema`
//! - a forced tool definition (Anthropic)
//! - a plain-text instruction for endpoints with no enforcement (Hugging Face)
//!
//! Vendors that insist on an object at the root get list schemas wrapped in a
//! synthetic `{"data": [...]}` container. [`ListPacking`] owns both directions
//! of that transformation so the normalizer can undo exactly what was done here.

use serde_json::{Map, Value, json};
use strata_core::{FieldType, Schema};

use crate::error::{ClientError, ClientResult, ValidationIssue};

/// Name of the synthetic field holding a wrapped list.
pub const WRAPPER_FIELD: &str = "data";

/// Name of the single tool synthesized for tool-call enforcement.
pub const TOOL_NAME: &str = "structured_output";

/// How a list schema travels to and from a vendor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListPacking {
    /// The vendor accepts a top-level array.
    Bare,
    /// The list is wrapped in `{"data": [...]}`.
    Wrapped,
    /// Wrapping is requested but not enforced; either shape is accepted back.
    BestEffort,
}

impl ListPacking {
    /// Whether the request side wraps list schemas.
    pub fn wraps(self) -> bool {
        !matches!(self, Self::Bare)
    }

    /// Wrap a list value the way this packing sends it.
    pub fn pack(self, list: Value) -> Value {
        if self.wraps() {
            let mut map = Map::new();
            let _ = map.insert(WRAPPER_FIELD.into(), list);
            Value::Object(map)
        } else {
            list
        }
    }

    /// Undo [`pack`](Self::pack) on a vendor payload.
    pub fn unpack(self, value: Value) -> ClientResult<Value> {
        match (self, value) {
            (Self::Bare, value) | (Self::BestEffort, value @ Value::Array(_)) => Ok(value),
            (Self::Wrapped | Self::BestEffort, Value::Object(mut map)) => {
                map.remove(WRAPPER_FIELD).ok_or_else(|| {
                    ClientError::validation(ValidationIssue::new(
                        WRAPPER_FIELD,
                        "missing list container field",
                    ))
                })
            }
            (_, other) => Err(ClientError::validation(ValidationIssue::root(format!(
                "expected an object with a `{WRAPPER_FIELD}` list, got {}",
                json_kind(&other)
            )))),
        }
    }
}

/// Short name of a JSON value's kind, for messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON schema
// ─────────────────────────────────────────────────────────────────────────────

fn field_json_schema(field_type: FieldType) -> Value {
    match field_type {
        FieldType::String => json!({"type": "string"}),
        FieldType::Integer => json!({"type": "integer"}),
        FieldType::Number => json!({"type": "number"}),
        FieldType::Boolean => json!({"type": "boolean"}),
        FieldType::Timestamp => json!({"type": "string", "format": "date-time"}),
    }
}

/// Strict JSON schema of one item: every field required, nothing else allowed.
pub fn object_json_schema(schema: &Schema) -> Value {
    let mut properties = Map::new();
    for field in schema.fields() {
        let _ = properties.insert(field.name.clone(), field_json_schema(field.field_type));
    }
    let required: Vec<Value> = schema
        .fields()
        .iter()
        .map(|f| Value::String(f.name.clone()))
        .collect();

    json!({
        "type": "object",
        "title": schema.name(),
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Full JSON schema for the response, with list packing applied.
pub fn json_schema(schema: &Schema, packing: ListPacking) -> Value {
    let item = object_json_schema(schema);
    if !schema.is_list() {
        return item;
    }
    let list = json!({"type": "array", "items": item});
    if !packing.wraps() {
        return list;
    }
    json!({
        "type": "object",
        "title": format!("{}List", schema.name()),
        "properties": {WRAPPER_FIELD: list},
        "required": [WRAPPER_FIELD],
        "additionalProperties": false,
    })
}

/// `response_format` for chat-completions APIs with strict JSON schema support.
pub fn response_format(schema: &Schema, packing: ListPacking) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": sanitize_name(schema.name()),
            "schema": json_schema(schema, packing),
            "strict": true,
        }
    })
}

/// Schema names must match `^[a-zA-Z0-9_-]{1,64}$` on chat-completions APIs.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "schema".to_string()
    } else {
        cleaned
    }
}

/// Single forced tool whose input schema is the (always wrapped) response schema.
pub fn tool_definition(schema: &Schema) -> Value {
    json!({
        "name": TOOL_NAME,
        "description": format!("Record the {} output. Always call this tool with the complete result.", schema.name()),
        "input_schema": json_schema(schema, ListPacking::Wrapped),
    })
}

/// Instruction embedding the JSON schema, for endpoints that cannot enforce one.
pub fn schema_instruction(schema: &Schema, packing: ListPacking) -> String {
    let rendered = json_schema(schema, packing).to_string();
    format!(
        "Respond only with a single JSON value that conforms to this JSON schema. \
         Do not add commentary or Markdown.\n{rendered}"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Gemini OpenAPI subset
// ─────────────────────────────────────────────────────────────────────────────

fn gemini_field(field_type: FieldType) -> Value {
    match field_type {
        FieldType::String => json!({"type": "STRING"}),
        FieldType::Integer => json!({"type": "INTEGER"}),
        FieldType::Number => json!({"type": "NUMBER"}),
        FieldType::Boolean => json!({"type": "BOOLEAN"}),
        FieldType::Timestamp => json!({"type": "STRING", "format": "date-time"}),
    }
}

/// `responseSchema` for Gemini. Lists are sent bare as `ARRAY`.
pub fn gemini_schema(schema: &Schema) -> Value {
    let mut properties = Map::new();
    for field in schema.fields() {
        let _ = properties.insert(field.name.clone(), gemini_field(field.field_type));
    }
    let names: Vec<Value> = schema
        .fields()
        .iter()
        .map(|f| Value::String(f.name.clone()))
        .collect();

    let item = json!({
        "type": "OBJECT",
        "properties": properties,
        "required": names.clone(),
        "propertyOrdering": names,
    });

    if schema.is_list() {
        json!({"type": "ARRAY", "items": item})
    } else {
        item
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn person() -> Schema {
        Schema::builder("Person")
            .field("name", "str")
            .field("age", "int")
            .field("born", "datetime")
            .build()
            .unwrap()
    }

    fn values() -> Schema {
        Schema::builder("Value").field("value", "int").list().build().unwrap()
    }

    #[test]
    fn object_schema_requires_every_field_in_order() {
        let schema = object_json_schema(&person());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["title"], "Person");
        assert_eq!(schema["required"], json!(["name", "age", "born"]));
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["properties"]["age"], json!({"type": "integer"}));
        assert_eq!(
            schema["properties"]["born"],
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[test]
    fn single_schema_ignores_packing() {
        assert_eq!(
            json_schema(&person(), ListPacking::Wrapped),
            json_schema(&person(), ListPacking::Bare)
        );
    }

    #[test]
    fn bare_list_schema_is_array() {
        let schema = json_schema(&values(), ListPacking::Bare);
        assert_eq!(schema["type"], "array");
        assert_eq!(schema["items"]["title"], "Value");
    }

    #[test]
    fn wrapped_list_schema_has_data_field() {
        let schema = json_schema(&values(), ListPacking::Wrapped);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["data"]));
        assert_eq!(schema["properties"]["data"]["type"], "array");
        assert_eq!(
            schema["properties"]["data"]["items"]["required"],
            json!(["value"])
        );
    }

    #[test]
    fn response_format_is_strict() {
        let format = response_format(&person(), ListPacking::Wrapped);
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "Person");
        assert_eq!(format["json_schema"]["strict"], true);
    }

    #[test]
    fn sanitize_replaces_and_truncates() {
        assert_eq!(sanitize_name("My Schema!"), "My_Schema_");
        assert_eq!(sanitize_name(&"x".repeat(80)).len(), 64);
        assert_eq!(sanitize_name("ok-name_1"), "ok-name_1");
    }

    #[test]
    fn tool_wraps_lists_and_keeps_objects() {
        let tool = tool_definition(&values());
        assert_eq!(tool["name"], TOOL_NAME);
        assert_eq!(tool["input_schema"]["type"], "object");
        assert!(tool["input_schema"]["properties"]["data"].is_object());

        let tool = tool_definition(&person());
        assert_eq!(tool["input_schema"]["title"], "Person");
    }

    #[test]
    fn gemini_schema_uses_openapi_types() {
        let schema = gemini_schema(&person());
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["name"]["type"], "STRING");
        assert_eq!(schema["properties"]["born"]["format"], "date-time");
        assert_eq!(schema["propertyOrdering"], json!(["name", "age", "born"]));

        let list = gemini_schema(&values());
        assert_eq!(list["type"], "ARRAY");
        assert_eq!(list["items"]["properties"]["value"]["type"], "INTEGER");
    }

    #[test]
    fn instruction_embeds_schema() {
        let text = schema_instruction(&values(), ListPacking::BestEffort);
        assert!(text.contains("\"data\""));
        assert!(text.contains("JSON schema"));
    }

    #[test]
    fn unpack_wrapped_requires_container() {
        let err = ListPacking::Wrapped.unpack(json!([1, 2])).unwrap_err();
        assert_matches!(err, ClientError::SchemaValidation { .. });

        let err = ListPacking::Wrapped.unpack(json!({"items": []})).unwrap_err();
        assert_eq!(err.issues()[0].path, "data");
    }

    #[test]
    fn unpack_best_effort_accepts_both_shapes() {
        let list = json!([{"value": 1}]);
        assert_eq!(ListPacking::BestEffort.unpack(list.clone()).unwrap(), list);
        assert_eq!(
            ListPacking::BestEffort
                .unpack(json!({"data": [{"value": 1}]}))
                .unwrap(),
            list
        );
    }

    #[test]
    fn unpack_bare_is_identity() {
        let value = json!({"data": []});
        assert_eq!(ListPacking::Bare.unpack(value.clone()).unwrap(), value);
    }

    fn list_strategy() -> impl Strategy<Value = Value> {
        prop::collection::vec(any::<i64>(), 0..8).prop_map(|items| {
            Value::Array(items.into_iter().map(|v| json!({"value": v})).collect())
        })
    }

    proptest! {
        #[test]
        fn unpack_inverts_pack(list in list_strategy()) {
            for packing in [ListPacking::Bare, ListPacking::Wrapped, ListPacking::BestEffort] {
                let packed = packing.pack(list.clone());
                prop_assert_eq!(packing.unpack(packed).unwrap(), list.clone());
            }
        }
    }
}
