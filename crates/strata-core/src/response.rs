//! Normalized responses and usage records.
//!
//! [`StructuredResponse`] is what every provider client hands back, for a
//! single-shot call and for each streamed chunk alike. Its fields are private
//! and only set by the constructors below, so a value never changes after it
//! leaves the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provider::Provider;

/// Metadata key holding the model identifier.
pub const META_MODEL: &str = "model";
/// Metadata key set on every streamed content chunk.
pub const META_STREAM_CHUNK: &str = "is_stream_chunk";
/// Metadata key set on the terminal usage-only chunk.
pub const META_FINAL_USAGE: &str = "is_final_usage";

/// Open mapping of auxiliary flags.
pub type Metadata = Map<String, Value>;

/// Schema-conforming (or raw text) payload of a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// One object with exactly the schema's fields.
    Object(Map<String, Value>),
    /// Ordered objects for a list schema.
    List(Vec<Map<String, Value>>),
    /// Free text, produced when no schema was requested.
    Text(String),
}

impl Content {
    /// The object, for single-object schemas.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// The items, for list schemas.
    pub fn as_list(&self) -> Option<&[Map<String, Value>]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The text, for schema-less requests.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Convert into a plain JSON value.
    pub fn into_value(self) -> Value {
        match self {
            Self::Object(map) => Value::Object(map),
            Self::List(items) => Value::Array(items.into_iter().map(Value::Object).collect()),
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Canonical token counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt-side tokens.
    pub input_tokens: u64,
    /// Generated tokens.
    pub output_tokens: u64,
    /// Total as reported by the provider, or `input + output`.
    pub total_tokens: u64,
}

impl Usage {
    /// Usage with a computed total.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// Usage with a provider-supplied total, trusted as-is.
    pub fn with_total(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Provider-agnostic result of one request or one stream chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
    provider: Provider,
    #[serde(default)]
    metadata: Metadata,
}

impl StructuredResponse {
    /// A complete single-shot response.
    pub fn complete(
        provider: Provider,
        model: &str,
        content: Content,
        usage: Option<Usage>,
    ) -> Self {
        Self {
            content: Some(content),
            usage,
            provider,
            metadata: base_metadata(model),
        }
    }

    /// A partial chunk of a streamed response.
    pub fn stream_chunk(provider: Provider, model: &str, content: Content) -> Self {
        let mut metadata = base_metadata(model);
        let _ = metadata.insert(META_STREAM_CHUNK.into(), Value::Bool(true));
        Self {
            content: Some(content),
            usage: None,
            provider,
            metadata,
        }
    }

    /// The terminal usage-only chunk of a streamed response.
    pub fn final_usage(provider: Provider, model: &str, usage: Usage) -> Self {
        let mut metadata = base_metadata(model);
        let _ = metadata.insert(META_FINAL_USAGE.into(), Value::Bool(true));
        Self {
            content: None,
            usage: Some(usage),
            provider,
            metadata,
        }
    }

    /// Attach an extra metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        let _ = self.metadata.insert(key.into(), value);
        self
    }

    /// Payload; absent only on the usage-only chunk.
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Take ownership of the payload.
    pub fn into_content(self) -> Option<Content> {
        self.content
    }

    /// Token counts, when the provider reported any.
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// Backend that produced this response.
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Auxiliary flags.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Model identifier recorded in metadata.
    pub fn model(&self) -> Option<&str> {
        self.metadata.get(META_MODEL).and_then(Value::as_str)
    }

    /// Whether this is a streamed content chunk.
    pub fn is_stream_chunk(&self) -> bool {
        flag(&self.metadata, META_STREAM_CHUNK)
    }

    /// Whether this is the terminal usage-only chunk.
    pub fn is_final_usage(&self) -> bool {
        flag(&self.metadata, META_FINAL_USAGE)
    }
}

fn base_metadata(model: &str) -> Metadata {
    let mut metadata = Map::new();
    let _ = metadata.insert(META_MODEL.into(), Value::String(model.to_string()));
    metadata
}

fn flag(metadata: &Metadata, key: &str) -> bool {
    metadata.get(key).and_then(Value::as_bool).unwrap_or(false)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
