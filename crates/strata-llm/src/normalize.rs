//! # Response Normalizer
//!
//! Validates raw vendor output against the requested [`Schema`] and produces
//! [`Content`] that holds exactly the declared fields, converted to their
//! declared types.
//!
//! Conversion is lax in the usual places (numeric strings, integral floats,
//! `"true"`/`"false"`, naive ISO timestamps) but a missing field, a `null`,
//! or a value that cannot be converted is always an error. Every issue in the
//! payload is collected before failing, each tagged with its path.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use strata_core::{Content, FieldType, Schema};

use crate::adapter::{ListPacking, json_kind};
use crate::error::{ClientError, ClientResult, ValidationIssue};

/// Strip a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse vendor text as JSON.
///
/// Empty output is a protocol error (the vendor sent nothing to validate);
/// text that is not JSON is a validation error.
pub fn parse_json_text(text: &str) -> ClientResult<Value> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(ClientError::protocol("response contained no output"));
    }
    serde_json::from_str(body).map_err(|e| {
        ClientError::validation(ValidationIssue::root(format!("output is not valid JSON: {e}")))
    })
}

/// Normalize JSON text against `schema`.
pub fn normalize_text(text: &str, schema: &Schema, packing: ListPacking) -> ClientResult<Content> {
    let value = parse_json_text(text)?;
    normalize_value(value, schema, packing)
}

/// Normalize an already-parsed value (JSON body, tool-call input) against `schema`.
pub fn normalize_value(
    value: Value,
    schema: &Schema,
    packing: ListPacking,
) -> ClientResult<Content> {
    let mut issues = Vec::new();

    let content = if schema.is_list() {
        let items = match packing.unpack(value)? {
            Value::Array(items) => items,
            other => {
                return Err(ClientError::validation(ValidationIssue::root(format!(
                    "expected a list, got {}",
                    json_kind(&other)
                ))));
            }
        };
        let mut objects = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            if let Some(object) = validate_item(item, schema, &format!("[{i}]"), &mut issues) {
                objects.push(object);
            }
        }
        Some(Content::List(objects))
    } else {
        validate_item(value, schema, "", &mut issues).map(Content::Object)
    };

    match content {
        Some(content) if issues.is_empty() => Ok(content),
        _ => Err(ClientError::SchemaValidation { issues }),
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn validate_item(
    value: Value,
    schema: &Schema,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Map<String, Value>> {
    let mut raw = match value {
        Value::Object(raw) => raw,
        other => {
            let at = if path.is_empty() { "$" } else { path };
            issues.push(ValidationIssue::new(
                at,
                format!("expected an object, got {}", json_kind(&other)),
            ));
            return None;
        }
    };

    let before = issues.len();
    let mut object = Map::new();
    for field in schema.fields() {
        let field_path = join_path(path, &field.name);
        match raw.remove(&field.name) {
            None => issues.push(ValidationIssue::new(field_path, "missing required field")),
            Some(Value::Null) => issues.push(ValidationIssue::new(
                field_path,
                format!("expected {}, got null", field.field_type),
            )),
            Some(v) => match coerce(v, field.field_type) {
                Ok(coerced) => {
                    let _ = object.insert(field.name.clone(), coerced);
                }
                Err(message) => issues.push(ValidationIssue::new(field_path, message)),
            },
        }
    }

    (issues.len() == before).then_some(object)
}

/// Convert one value to `field_type`, or describe why it cannot be.
pub fn coerce(value: Value, field_type: FieldType) -> Result<Value, String> {
    let mismatch = |v: &Value| format!("expected {field_type}, got {}", json_kind(v));
    match field_type {
        FieldType::String => match value {
            Value::String(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        FieldType::Integer => coerce_integer(&value).ok_or_else(|| mismatch(&value)),
        FieldType::Number => match &value {
            Value::Number(n) => Ok(Value::Number(n.clone())),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch(&value)),
            _ => Err(mismatch(&value)),
        },
        FieldType::Boolean => match &value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(mismatch(&value)),
        },
        FieldType::Timestamp => coerce_timestamp(&value)
            .map(Value::String)
            .ok_or_else(|| format!("expected timestamp, got {}", describe(&value))),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("unparseable string {s:?}"),
        other => json_kind(other).to_string(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => {
            let f = n.as_f64()?;
            // 2^63 is exact in f64, i64::MAX is not.
            let bound = -(i64::MIN as f64);
            (f.is_finite() && f.fract() == 0.0 && f >= -bound && f < bound)
                .then(|| Value::from(f as i64))
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

/// Normalize a timestamp to an RFC 3339 UTC string.
///
/// Accepts RFC 3339, naive ISO date-times and dates (taken as UTC), and
/// integer Unix seconds.
pub fn coerce_timestamp(value: &Value) -> Option<String> {
    let parsed = match value {
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0)?,
        Value::String(s) => parse_timestamp(s.trim())?,
        _ => return None,
    };
    Some(parsed.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
