//! Gemini client implementing [`StructuredClient`].

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

use super::types::GenerateContentResponse;

/// Gemini sends no end marker; the last event may lack a trailing blank line.
const SSE_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: true,
};

const PACKING: ListPacking = ListPacking::Bare;

/// Client for the Gemini API.
#[derive(Debug)]
pub struct GoogleClient {
    conn: Connection,
}

impl GoogleClient {
    /// Create a client for one model.
    pub(crate) fn new(http: reqwest::Client, endpoint: &ProviderSettings, model: &str) -> Self {
        let conn = Connection::new(Provider::Google, http, endpoint, model);
        info!(model, base_url = %conn.base_url, "google client initialized");
        Self { conn }
    }

    fn build_body(&self, prompt: &str, schema: Option<&Schema>, options: &RequestOptions) -> Value {
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        });
        if let Some(schema) = schema {
            body = strata_settings::deep_merge(body, self.format_schema(schema));
        }
        options.merge_into(body)
    }

    fn request(&self, path: &str, body: &Value) -> ClientResult<reqwest::RequestBuilder> {
        let key = self.conn.require_key()?;
        Ok(self
            .conn
            .http
            .post(self.conn.url(path))
            .header("x-goog-api-key", key)
            .json(body))
    }

    async fn generate_inner(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        let body = self.build_body(prompt, schema, options);
        let path = format!("/models/{}:generateContent", self.conn.model);
        debug!(structured = schema.is_some(), "sending generateContent");
        let response = send(self.request(&path, &body)?).await?;
        let reply: GenerateContentResponse = read_json(response).await?;

        check_blocked(&reply)?;
        if reply.candidates.is_empty() {
            return Err(ClientError::protocol("response contained no candidates"));
        }
        let usage = reply.usage_metadata.as_ref().and_then(|u| self.format_usage(u));
        let text = reply.text();
        let content = match schema {
            Some(schema) => normalize_text(&text, schema, PACKING)?,
            None => Content::Text(text),
        };
        Ok(StructuredResponse::complete(
            Provider::Google,
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
        let body = self.build_body(prompt, schema, options);
        let path = format!("/models/{}:streamGenerateContent?alt=sse", self.conn.model);
        debug!(structured = schema.is_some(), "starting streamGenerateContent");
        let response = send(self.request(&path, &body)?).await?;

        let events = sse_events::<GenerateContentResponse>(response, SSE_OPTIONS);
        let mut assembler = DeltaAssembler::new(
            Provider::Google,
            &self.conn.model,
            schema.cloned(),
            PACKING,
            Discipline::Snapshot,
        );
        let mut usage = UsageAccumulator::new(Provider::Google);

        Ok(boxed(async_stream::try_stream! {
            let mut events = std::pin::pin!(events);
            while let Some(event) = events.next().await {
                let event = event?;
                check_blocked(&event)?;
                if let Some(payload) = &event.usage_metadata {
                    usage.observe(payload);
                }
                if let Some(out) = assembler.push(&event.text()) {
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

fn check_blocked(reply: &GenerateContentResponse) -> ClientResult<()> {
    match reply.block_reason() {
        Some(reason) => Err(ClientError::protocol(format!("prompt blocked: {reason}"))),
        None => Ok(()),
    }
}

#[async_trait]
impl StructuredClient for GoogleClient {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn model(&self) -> &str {
        &self.conn.model
    }

    fn format_schema(&self, schema: &Schema) -> Value {
        json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": adapter::gemini_schema(schema),
            }
        })
    }

    #[instrument(skip_all, fields(provider = "google", model = %self.conn.model))]
    async fn generate(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        log_outcome("generate", self.generate_inner(prompt, schema, options).await)
    }

    #[instrument(skip_all, fields(provider = "google", model = %self.conn.model))]
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

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use strata_core::Usage;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn values() -> Schema {
        Schema::builder("Value").field("value", "int").list().build().unwrap()
    }

    fn client(base_url: &str) -> GoogleClient {
        GoogleClient::new(
            reqwest::Client::new(),
            &ProviderSettings::new(base_url).with_api_key("g-key"),
            "gemini-test",
        )
    }

    fn reply(text: &str) -> Value {
        json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 5, "totalTokenCount": 13}
        })
    }

    fn text_event(text: &str) -> Value {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
    }

    #[test]
    fn body_sets_mime_type_and_schema() {
        let c = client("http://unused");
        let options = RequestOptions::new().with("generationConfig", json!({"temperature": 0}));
        let body = c.build_body("p", Some(&values()), &options);
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "ARRAY");
        assert_eq!(config["temperature"], 0);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "p");
    }

    #[tokio::test]
    async fn generate_bare_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(reply(r#"[{"value": 1}, {"value": 2}]"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server.uri())
            .generate("values", Some(&values()), &RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(
            resp.content().unwrap().clone().into_value(),
            json!([{"value": 1}, {"value": 2}])
        );
        assert_eq!(resp.usage(), Some(&Usage::with_total(8, 5, 13)));
    }

    #[tokio::test]
    async fn blocked_prompt_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .generate("p", Some(&values()), &RequestOptions::new())
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::ProviderProtocol { ref message } if message.contains("SAFETY"));
    }

    #[tokio::test]
    async fn invalid_key_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .generate("p", None, &RequestOptions::new())
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::Api { status: Some(400), ref message, .. } if message == "API key not valid.");
    }

    #[tokio::test]
    async fn stream_snapshots_then_usage() {
        let server = MockServer::start().await;
        let events = [
            text_event("[{\"value\": 1}"),
            text_event(", {\"value\": 2}]"),
            json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": ""}]}, "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 6, "totalTokenCount": 9}
            }),
        ];
        // No trailing blank line after the last event.
        let body = events
            .iter()
            .map(|e| format!("data: {e}"))
            .collect::<Vec<_>>()
            .join("\r\n\r\n");
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let items: Vec<_> = client(&server.uri())
            .stream("p", Some(&values()), &RequestOptions::new())
            .await
            .unwrap()
            .collect()
            .await;
        let items: Vec<_> = items.into_iter().map(Result::unwrap).collect();

        let lens: Vec<_> = items
            .iter()
            .filter_map(|i| i.content())
            .map(|c| c.as_list().unwrap().len())
            .collect();
        assert_eq!(lens, [1, 2]);
        let last = items.last().unwrap();
        assert!(last.is_final_usage());
        assert_eq!(last.usage(), Some(&Usage::with_total(3, 6, 9)));
    }

    #[tokio::test]
    async fn stream_without_usage_has_no_usage_chunk() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(format!("data: {}\n\n", text_event("hello"))),
            )
            .mount(&server)
            .await;

        let items: Vec<_> = client(&server.uri())
            .stream("p", None, &RequestOptions::new())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(items.iter().all(|i| !i.as_ref().unwrap().is_final_usage()));
    }
}
