//! Anthropic client implementing [`StructuredClient`].

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use strata_core::{Content, Provider, Schema, StructuredResponse};
use strata_settings::AnthropicSettings;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{self, ListPacking, TOOL_NAME};
use crate::assemble::{DeltaAssembler, Discipline};
use crate::client::{Connection, RequestOptions, ResponseStream, StructuredClient};
use crate::error::{ClientError, ClientResult};
use crate::normalize::normalize_value;
use crate::sse::SseParserOptions;
use crate::stream_pipeline::{boxed, log_outcome, read_json, send, sse_events};
use crate::usage::UsageAccumulator;

use super::types::{ContentBlock, MessagesResponse, StreamDelta, StreamEvent};

/// Anthropic terminates with `message_stop`; a trailing partial line is noise.
const SSE_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: false,
};

/// The tool input schema always wraps lists.
const PACKING: ListPacking = ListPacking::Wrapped;

/// Client for the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicClient {
    conn: Connection,
    api_version: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Create a client for one model.
    pub(crate) fn new(http: reqwest::Client, settings: &AnthropicSettings, model: &str) -> Self {
        let conn = Connection::new(Provider::Anthropic, http, &settings.endpoint, model);
        info!(
            model,
            base_url = %conn.base_url,
            api_version = %settings.api_version,
            "anthropic client initialized"
        );
        Self {
            conn,
            api_version: settings.api_version.clone(),
            max_tokens: settings.max_tokens,
        }
    }

    fn build_body(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
        stream: bool,
    ) -> Value {
        let mut body = json!({
            "model": self.conn.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });
        if stream {
            body["stream"] = Value::Bool(true);
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
            .post(self.conn.url("/messages"))
            .header("x-api-key", key)
            .header("anthropic-version", &self.api_version)
            .json(body))
    }

    async fn generate_inner(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        let body = self.build_body(prompt, schema, options, false);
        debug!(structured = schema.is_some(), "sending messages request");
        let response = send(self.request(&body)?).await?;
        let message: MessagesResponse = read_json(response).await?;

        let usage = message.usage.as_ref().and_then(|u| self.format_usage(u));
        let content = match schema {
            Some(schema) => {
                let input = tool_input(message.content).ok_or_else(|| {
                    ClientError::protocol(format!(
                        "no {TOOL_NAME} tool call in response (stop_reason: {})",
                        message.stop_reason.as_deref().unwrap_or("none")
                    ))
                })?;
                normalize_value(input, schema, PACKING)?
            }
            None => Content::Text(joined_text(&message.content)),
        };
        Ok(StructuredResponse::complete(
            Provider::Anthropic,
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
        debug!(structured = schema.is_some(), "starting messages stream");
        let response = send(self.request(&body)?).await?;

        let events = sse_events::<StreamEvent>(response, SSE_OPTIONS);
        let structured = schema.is_some();
        let mut assembler = DeltaAssembler::new(
            Provider::Anthropic,
            &self.conn.model,
            schema.cloned(),
            PACKING,
            Discipline::Snapshot,
        );
        let mut usage = UsageAccumulator::new(Provider::Anthropic);

        Ok(boxed(async_stream::try_stream! {
            let mut events = std::pin::pin!(events);
            while let Some(event) = events.next().await {
                let delta = match event? {
                    StreamEvent::MessageStart { message } => {
                        if let Some(payload) = &message.usage {
                            usage.observe(payload);
                        }
                        continue;
                    }
                    StreamEvent::MessageDelta { usage: Some(payload) } => {
                        usage.observe(&payload);
                        continue;
                    }
                    StreamEvent::ContentBlockDelta { delta, .. } => delta,
                    StreamEvent::MessageDelta { usage: None } | StreamEvent::Other => continue,
                };
                let text = match delta {
                    StreamDelta::InputJsonDelta { partial_json } if structured => partial_json,
                    StreamDelta::TextDelta { text } if !structured => text,
                    _ => continue,
                };
                if let Some(out) = assembler.push(&text) {
                    yield out;
                }
            }
            if let Some(out) = assembler.finish()? {
                yield out;
            }
            if let Some(out) = assembler.usage_chunk(usage.finish()) {
                yield out;
            }
        }))
    }
}

/// Input of the forced tool call, if the model made one.
fn tool_input(blocks: Vec<ContentBlock>) -> Option<Value> {
    blocks.into_iter().find_map(|block| match block {
        ContentBlock::ToolUse { name, input } if name == TOOL_NAME => Some(input),
        ContentBlock::ToolUse { name, .. } => {
            warn!(tool = %name, "ignoring unexpected tool call");
            None
        }
        _ => None,
    })
}

fn joined_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl StructuredClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.conn.model
    }

    fn format_schema(&self, schema: &Schema) -> Value {
        json!({
            "tools": [adapter::tool_definition(schema)],
            "tool_choice": {"type": "tool", "name": TOOL_NAME},
        })
    }

    #[instrument(skip_all, fields(provider = "anthropic", model = %self.conn.model))]
    async fn generate(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        log_outcome("generate", self.generate_inner(prompt, schema, options).await)
    }

    #[instrument(skip_all, fields(provider = "anthropic", model = %self.conn.model))]
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
