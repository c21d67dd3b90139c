//! # Structured client trait
//!
//! Core abstraction over vendor backends. Every provider implements
//! [`StructuredClient`] to expose the same capability set: format a schema,
//! format usage, generate once, and stream.
//!
//! A client owns one HTTP connection handle and one model identifier, both
//! fixed at construction. Nothing inside is mutated by a request, so a single
//! client can serve any number of concurrent calls.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};
use strata_core::{Provider, Schema, StructuredResponse, Usage};
use strata_settings::{ProviderSettings, deep_merge};

use crate::error::{ClientError, ClientResult};
use crate::usage::extract_usage;

/// Boxed stream of [`StructuredResponse`] chunks returned by [`StructuredClient::stream`].
///
/// Finite and not restartable. Dropping it early closes the underlying
/// connection.
pub type ResponseStream = Pin<Box<dyn Stream<Item = ClientResult<StructuredResponse>> + Send>>;

/// Open key/value bag passed through verbatim to the vendor request body.
///
/// Entries are deep-merged over the body the client builds, so nested
/// objects (`generationConfig`, `options`) extend rather than replace it.
/// `null` entries are skipped by the merge: an option cannot be sent as an
/// explicit JSON `null`, nor can it remove a field the client sets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// Extra request-body entries.
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        let _ = self.extra.insert(key.into(), value);
        self
    }

    /// Whether there is nothing to merge.
    pub fn is_empty(&self) -> bool {
        self.extra.is_empty()
    }

    /// Merge the extra entries over a request body.
    pub fn merge_into(&self, body: Value) -> Value {
        if self.extra.is_empty() {
            return body;
        }
        deep_merge(body, Value::Object(self.extra.clone()))
    }
}

impl From<Map<String, Value>> for RequestOptions {
    fn from(extra: Map<String, Value>) -> Self {
        Self { extra }
    }
}

/// One inbound request: prompt, optional schema, target provider and model.
#[derive(Clone, Debug)]
pub struct StructuredRequest {
    /// Natural-language prompt.
    pub prompt: String,
    /// Expected output shape; `None` returns raw text.
    pub schema: Option<Schema>,
    /// Provider identifier (`"openai"`, `"google"`, ...).
    pub provider: String,
    /// Model identifier; `None` uses the provider default.
    pub model: Option<String>,
    /// Extra vendor options.
    pub options: RequestOptions,
}

impl StructuredRequest {
    /// Request for `provider` with the given prompt and no schema.
    pub fn new(provider: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema: None,
            provider: provider.into(),
            model: None,
            options: RequestOptions::default(),
        }
    }

    /// Set the output schema.
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add one extra vendor option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options = self.options.with(key, value);
        self
    }
}

/// Capability set shared by every provider client.
///
/// Implementors must be `Send + Sync` so one instance can be shared across
/// tasks behind an `Arc`. Their `Debug` output must not reveal credentials.
#[async_trait]
pub trait StructuredClient: fmt::Debug + Send + Sync {
    /// Backend this client talks to.
    fn provider(&self) -> Provider;

    /// Model identifier fixed at construction.
    fn model(&self) -> &str;

    /// Provider-native schema artifact, as the request-body fragment the
    /// client merges into its requests.
    fn format_schema(&self, schema: &Schema) -> Value;

    /// Map this provider's usage payload to a canonical record.
    fn format_usage(&self, payload: &Value) -> Option<Usage> {
        extract_usage(self.provider(), payload)
    }

    /// Issue one request and return the complete, normalized response.
    async fn generate(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse>;

    /// Issue one streaming request.
    ///
    /// Content chunks carry `is_stream_chunk`; the stream ends with at most
    /// one usage-only chunk carrying `is_final_usage`.
    async fn stream(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<ResponseStream>;
}

/// Read-only state every client holds: HTTP handle, endpoint, key, model.
#[derive(Clone)]
pub(crate) struct Connection {
    pub(crate) provider: Provider,
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    api_key: Option<String>,
    pub(crate) model: String,
}

impl Connection {
    pub(crate) fn new(
        provider: Provider,
        http: reqwest::Client,
        endpoint: &ProviderSettings,
        model: &str,
    ) -> Self {
        Self {
            provider,
            http,
            base_url: endpoint.trimmed_base_url().to_string(),
            api_key: endpoint.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
        }
    }

    /// The API key, or an auth error naming the provider.
    pub(crate) fn require_key(&self) -> ClientResult<&str> {
        self.api_key.as_deref().ok_or_else(|| ClientError::Auth {
            message: format!("no API key configured for {}", self.provider),
        })
    }

    /// The API key, when one is configured.
    pub(crate) fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
