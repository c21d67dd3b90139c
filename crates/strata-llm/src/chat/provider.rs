//! Chat-completions client implementing [`StructuredClient`].
//!
//! # Enforcement
//!
//! - `OpenAI` and Mistral: `response_format` with a strict JSON schema. List
//!   schemas are wrapped because the root must be an object.
//! - Hugging Face router: `response_format: {"type": "json_object"}` plus a
//!   system message carrying the schema. Nothing is enforced server-side, so
//!   either a bare array or the wrapper is accepted back.
//!
//! # Streaming
//!
//! `OpenAI` content deltas are surfaced as validated snapshots. Mistral and
//! Hugging Face deltas are accumulated and parsed once at the end.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use strata_core::{Content, Provider, Schema, StructuredResponse};
use strata_settings::ProviderSettings;
use tracing::{debug, info, instrument};

use crate::adapter::{self, ListPacking};
use crate::assemble::{DeltaAssembler, Discipline};
use crate::client::{Connection, RequestOptions, ResponseStream, StructuredClient};
use crate::error::{ClientError, ClientResult};
use crate::normalize::normalize_text;
use crate::sse::SseParserOptions;
use crate::stream_pipeline::{boxed, log_outcome, read_json, send, sse_events};
use crate::usage::UsageAccumulator;

use super::types::{ChatChunk, ChatCompletion};

/// Chat-completions streams end with an explicit `[DONE]` marker.
const SSE_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: false,
};

/// How a chat-completions endpoint is asked for structured output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enforcement {
    /// `response_format: json_schema` with `strict: true`.
    JsonSchema,
    /// `response_format: json_object` plus a schema instruction.
    JsonObject,
}

/// What differs between chat-completions vendors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatFlavor {
    /// Vendor identity.
    pub provider: Provider,
    /// Schema enforcement mechanism.
    pub enforcement: Enforcement,
    /// List schema packing.
    pub packing: ListPacking,
    /// Streaming discipline.
    pub discipline: Discipline,
    /// Whether to request `stream_options.include_usage`.
    pub stream_usage: bool,
}

impl ChatFlavor {
    /// `OpenAI` chat completions.
    pub const OPENAI: Self = Self {
        provider: Provider::OpenAi,
        enforcement: Enforcement::JsonSchema,
        packing: ListPacking::Wrapped,
        discipline: Discipline::Snapshot,
        stream_usage: true,
    };

    /// Mistral chat completions; usage arrives on the last chunk unasked.
    pub const MISTRAL: Self = Self {
        provider: Provider::Mistral,
        enforcement: Enforcement::JsonSchema,
        packing: ListPacking::Wrapped,
        discipline: Discipline::Accumulate,
        stream_usage: false,
    };

    /// Hugging Face inference router.
    pub const HUGGINGFACE: Self = Self {
        provider: Provider::HuggingFace,
        enforcement: Enforcement::JsonObject,
        packing: ListPacking::BestEffort,
        discipline: Discipline::Accumulate,
        stream_usage: true,
    };
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug)]
pub struct ChatClient {
    flavor: ChatFlavor,
    conn: Connection,
}

impl ChatClient {
    /// Create a client for one vendor and model.
    pub(crate) fn new(
        flavor: ChatFlavor,
        http: reqwest::Client,
        endpoint: &ProviderSettings,
        model: &str,
    ) -> Self {
        let conn = Connection::new(flavor.provider, http, endpoint, model);
        info!(provider = %flavor.provider, model, base_url = %conn.base_url, "chat client initialized");
        Self { flavor, conn }
    }

    /// Build the request body: messages, schema fragment, then extra options.
    fn build_body(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
        stream: bool,
    ) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let (Some(schema), Enforcement::JsonObject) = (schema, self.flavor.enforcement) {
            messages.push(json!({
                "role": "system",
                "content": adapter::schema_instruction(schema, self.flavor.packing),
            }));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let mut body = json!({
            "model": self.conn.model,
            "messages": messages,
        });
        if stream {
            body["stream"] = Value::Bool(true);
            if self.flavor.stream_usage {
                body["stream_options"] = json!({"include_usage": true});
            }
        }
        if let Some(schema) = schema {
            body = strata_settings::deep_merge(body, self.format_schema(schema));
        }
        options.merge_into(body)
    }

    fn request(&self, body: &Value) -> ClientResult<reqwest::RequestBuilder> {
        let key = self.conn.require_key()?;
        Ok(self
            .conn
            .http
            .post(self.conn.url("/chat/completions"))
            .bearer_auth(key)
            .json(body))
    }

    async fn generate_inner(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        let body = self.build_body(prompt, schema, options, false);
        debug!(structured = schema.is_some(), "sending chat completion");
        let response = send(self.request(&body)?).await?;
        let completion: ChatCompletion = read_json(response).await?;

        let usage = completion.usage.as_ref().and_then(|u| self.format_usage(u));
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::protocol("response contained no choices"))?;
        if let Some(refusal) = choice.message.refusal {
            return Err(ClientError::protocol(format!("model refused: {refusal}")));
        }
        let text = choice.message.content.unwrap_or_default();

        let content = match schema {
            Some(schema) => normalize_text(&text, schema, self.flavor.packing)
                .map_err(|e| e.with_stop_reason(choice.finish_reason.as_deref()))?,
            None => Content::Text(text),
        };
        Ok(StructuredResponse::complete(
            self.flavor.provider,
            &self.conn.model,
            content,
            usage,
        ))
    }

    async fn stream_inner(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<ResponseStream> {
        let body = self.build_body(prompt, schema, options, true);
        debug!(structured = schema.is_some(), "starting chat completion stream");
        let response = send(self.request(&body)?).await?;

        let events = sse_events::<ChatChunk>(response, SSE_OPTIONS);
        let mut assembler = DeltaAssembler::new(
            self.flavor.provider,
            &self.conn.model,
            schema.cloned(),
            self.flavor.packing,
            self.flavor.discipline,
        );
        let mut usage = UsageAccumulator::new(self.flavor.provider);

        Ok(boxed(async_stream::try_stream! {
            let mut events = std::pin::pin!(events);
            let mut finish_reason: Option<String> = None;
            while let Some(event) = events.next().await {
                let chunk = event?;
                if let Some(payload) = &chunk.usage {
                    usage.observe(payload);
                }
                for choice in chunk.choices {
                    if choice.finish_reason.is_some() {
                        finish_reason = choice.finish_reason;
                    }
                    if let Some(refusal) = choice.delta.refusal {
                        Err::<(), _>(ClientError::protocol(format!("model refused: {refusal}")))?;
                    }
                    if let Some(text) = choice.delta.content {
                        if let Some(out) = assembler.push(&text) {
                            yield out;
                        }
                    }
                }
            }
            let last = assembler
                .finish()
                .map_err(|e| e.with_stop_reason(finish_reason.as_deref()))?;
            if let Some(out) = last {
                yield out;
            }
            if let Some(out) = assembler.usage_chunk(usage.finish()) {
                yield out;
            }
        }))
    }
}

#[async_trait]
impl StructuredClient for ChatClient {
    fn provider(&self) -> Provider {
        self.flavor.provider
    }

    fn model(&self) -> &str {
        &self.conn.model
    }

    fn format_schema(&self, schema: &Schema) -> Value {
        match self.flavor.enforcement {
            Enforcement::JsonSchema => json!({
                "response_format": adapter::response_format(schema, self.flavor.packing),
            }),
            Enforcement::JsonObject => json!({
                "response_format": {"type": "json_object"},
            }),
        }
    }

    #[instrument(skip_all, fields(provider = %self.flavor.provider, model = %self.conn.model))]
    async fn generate(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        log_outcome("generate", self.generate_inner(prompt, schema, options).await)
    }

    #[instrument(skip_all, fields(provider = %self.flavor.provider, model = %self.conn.model))]
    async fn stream(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<ResponseStream> {
        log_outcome("stream", self.stream_inner(prompt, schema, options).await)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
