//! Output schemas.
//!
//! A [`Schema`] is a runtime value, not a compiled type: callers assemble it
//! from user input (field names and type names) right before a request.
//! Validation of names and types happens in [`SchemaBuilder::build`], so a
//! bad definition never reaches a provider.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Primitive type of a schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Floating point number.
    Number,
    /// Boolean.
    Boolean,
    /// Point in time, carried as an RFC 3339 string.
    Timestamp,
}

impl FieldType {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }

    /// Parse a user-facing type name (`str`, `int`, `datetime`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "str" | "string" | "text" => Some(Self::String),
            "int" | "integer" => Some(Self::Integer),
            "float" | "number" => Some(Self::Number),
            "bool" | "boolean" => Some(Self::Boolean),
            "datetime" | "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CoreError::UnknownFieldType {
            field: String::new(),
            type_name: s.to_string(),
        })
    }
}

/// One named, typed, required field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique within its schema.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Top-level shape of the expected output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Exactly one object.
    #[default]
    Single,
    /// An ordered list of objects.
    List,
}

/// Provider-agnostic description of the expected output.
///
/// Immutable once built. Fields keep their declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    shape: Shape,
}

impl Schema {
    /// Start building a schema with the given name.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Schema name (used as the title of emitted artifacts).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Single object or list of objects.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Whether the output is a list of objects.
    pub fn is_list(&self) -> bool {
        self.shape == Shape::List
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Incremental builder for [`Schema`].
///
/// Type names are kept as text until [`build`](Self::build) so that the
/// whole definition is validated in one place.
#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, PendingType)>,
    shape: Shape,
}

#[derive(Clone, Debug)]
enum PendingType {
    Known(FieldType),
    Named(String),
}

impl SchemaBuilder {
    /// New builder for a single-object schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            shape: Shape::Single,
        }
    }

    /// Add a field whose type is given by name (`"str"`, `"int"`, `"datetime"`, ...).
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields
            .push((name.into(), PendingType::Named(type_name.into())));
        self
    }

    /// Add a field with an already-resolved type.
    #[must_use]
    pub fn typed_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields
            .push((name.into(), PendingType::Known(field_type)));
        self
    }

    /// Make the schema describe a list of objects.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.shape = Shape::List;
        self
    }

    /// Set the shape explicitly.
    #[must_use]
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Validate and produce the schema.
    pub fn build(self) -> Result<Schema, CoreError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::EmptySchemaName);
        }
        if self.fields.is_empty() {
            return Err(CoreError::NoFields(name));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (field_name, pending) in self.fields {
            let field_name = field_name.trim().to_string();
            if field_name.is_empty() {
                return Err(CoreError::EmptyFieldName);
            }
            if !seen.insert(field_name.clone()) {
                return Err(CoreError::DuplicateField(field_name));
            }
            let field_type = match pending {
                PendingType::Known(t) => t,
                PendingType::Named(type_name) => FieldType::from_name(&type_name).ok_or_else(
                    || CoreError::UnknownFieldType {
                        field: field_name.clone(),
                        type_name,
                    },
                )?,
            };
            fields.push(Field {
                name: field_name,
                field_type,
            });
        }

        Ok(Schema {
            name,
            fields,
            shape: self.shape,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
