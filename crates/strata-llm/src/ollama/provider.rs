//! Ollama client implementing [`StructuredClient`].

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use strata_core::{Content, Provider, Schema, StructuredResponse};
use strata_settings::ProviderSettings;
use tracing::{debug, info, instrument};

use crate::adapter::{self, ListPacking};
use crate::assemble::{DeltaAssembler, Discipline};
use crate::client::{Connection, RequestOptions, ResponseStream, StructuredClient};
use crate::error::ClientResult;
use crate::normalize::normalize_text;
use crate::sse::SseParserOptions;
use crate::stream_pipeline::{boxed, log_outcome, ndjson_events, read_json, send};
use crate::usage::UsageAccumulator;

use super::types::ChatResponse;

const NDJSON_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: true,
};

const PACKING: ListPacking = ListPacking::Bare;

/// Client for a local or remote Ollama server.
#[derive(Debug)]
pub struct OllamaClient {
    conn: Connection,
}

impl OllamaClient {
    /// Create a client for one model. An API key is optional.
    pub(crate) fn new(http: reqwest::Client, endpoint: &ProviderSettings, model: &str) -> Self {
        let conn = Connection::new(Provider::Ollama, http, endpoint, model);
        info!(model, host = %conn.base_url, "ollama client initialized");
        Self { conn }
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
            "messages": [{"role": "user", "content": prompt}],
            "stream": stream,
        });
        if let Some(schema) = schema {
            body = strata_settings::deep_merge(body, self.format_schema(schema));
        }
        options.merge_into(body)
    }

    fn request(&self, body: &Value) -> reqwest::RequestBuilder {
        let request = self.conn.http.post(self.conn.url("/api/chat")).json(body);
        match self.conn.api_key() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn generate_inner(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        let body = self.build_body(prompt, schema, options, false);
        debug!(structured = schema.is_some(), "sending chat request");
        let response = send(self.request(&body)).await?;
        let reply: ChatResponse = read_json(response).await?;

        let usage = reply.usage_payload().and_then(|u| self.format_usage(&u));
        let content = match schema {
            Some(schema) => normalize_text(reply.content(), schema, PACKING)
                .map_err(|e| e.with_stop_reason(reply.done_reason.as_deref()))?,
            None => Content::Text(reply.content().to_string()),
        };
        Ok(StructuredResponse::complete(
            Provider::Ollama,
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
        debug!(structured = schema.is_some(), "starting chat stream");
        let response = send(self.request(&body)).await?;

        let events = ndjson_events::<ChatResponse>(response, NDJSON_OPTIONS);
        let mut assembler = DeltaAssembler::new(
            Provider::Ollama,
            &self.conn.model,
            schema.cloned(),
            PACKING,
            Discipline::Accumulate,
        );
        let mut usage = UsageAccumulator::new(Provider::Ollama);

        Ok(boxed(async_stream::try_stream! {
            let mut events = std::pin::pin!(events);
            let mut done_reason: Option<String> = None;
            while let Some(event) = events.next().await {
                let line = event?;
                if let Some(payload) = line.usage_payload() {
                    usage.observe(&payload);
                }
                if let Some(out) = assembler.push(line.content()) {
                    yield out;
                }
                if line.done {
                    done_reason = line.done_reason;
                    break;
                }
            }
            let last = assembler
                .finish()
                .map_err(|e| e.with_stop_reason(done_reason.as_deref()))?;
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
impl StructuredClient for OllamaClient {
    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    fn model(&self) -> &str {
        &self.conn.model
    }

    fn format_schema(&self, schema: &Schema) -> Value {
        json!({"format": adapter::json_schema(schema, PACKING)})
    }

    #[instrument(skip_all, fields(provider = "ollama", model = %self.conn.model))]
    async fn generate(
        &self,
        prompt: &str,
        schema: Option<&Schema>,
        options: &RequestOptions,
    ) -> ClientResult<StructuredResponse> {
        log_outcome("generate", self.generate_inner(prompt, schema, options).await)
    }

    #[instrument(skip_all, fields(provider = "ollama", model = %self.conn.model))]
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
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::ClientError;

    fn person() -> Schema {
        Schema::builder("Person")
            .field("name", "str")
            .field("age", "int")
            .build()
            .unwrap()
    }

    fn client(base_url: &str) -> OllamaClient {
        OllamaClient::new(reqwest::Client::new(), &ProviderSettings::new(base_url), "llama-test")
    }

    fn line(content: &str, done: bool) -> Value {
        let mut value = json!({
            "model": "llama-test",
            "message": {"role": "assistant", "content": content},
            "done": done,
        });
        if done {
            value["prompt_eval_count"] = json!(26);
            value["eval_count"] = json!(12);
        }
        value
    }

    #[test]
    fn body_carries_bare_schema_and_explicit_stream_flag() {
        let c = client("http://unused");
        let schema = Schema::builder("V").field("v", "int").list().build().unwrap();
        let body = c.build_body("p", Some(&schema), &RequestOptions::new(), false);
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"]["type"], "array");
        assert_eq!(body["format"]["items"]["required"], json!(["v"]));
    }

    #[tokio::test]
    async fn generate_without_key_and_with_computed_total() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": false, "model": "llama-test"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(line(r#"{"name": "Ada", "age": 36}"#, true)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server.uri())
            .generate("p", Some(&person()), &RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.content().unwrap().as_object().unwrap()["name"], "Ada");
        assert_eq!(resp.usage(), Some(&Usage::new(26, 12)));
        assert_eq!(resp.usage().unwrap().total_tokens, 38);
    }

    #[tokio::test]
    async fn optional_key_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer hosted-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(line("hi", true)))
            .expect(1)
            .mount(&server)
            .await;

        let c = OllamaClient::new(
            reqwest::Client::new(),
            &ProviderSettings::new(server.uri()).with_api_key("hosted-key"),
            "llama-test",
        );
        let resp = c.generate("p", None, &RequestOptions::new()).await.unwrap();
        assert_eq!(resp.content().unwrap().as_text(), Some("hi"));
    }

    #[tokio::test]
    async fn unknown_model_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"error": "model \"nope\" not found, try pulling it first"})),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .generate("p", None, &RequestOptions::new())
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::Api { status: Some(404), ref message, .. } if message.contains("not found"));
    }

    #[tokio::test]
    async fn stream_accumulates_ndjson() {
        let server = MockServer::start().await;
        let lines = [
            line("{\"name\": ", false),
            line("\"Ada\", \"age\": ", false),
            line("36}", false),
            line("", true),
        ];
        // The final line has no trailing newline.
        let body = lines.iter().map(Value::to_string).collect::<Vec<_>>().join("\n");
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-ndjson")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let items: Vec<_> = client(&server.uri())
            .stream("p", Some(&person()), &RequestOptions::new())
            .await
            .unwrap()
            .collect()
            .await;
        let items: Vec<_> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content().unwrap().as_object().unwrap()["age"], 36);
        assert!(items[1].is_final_usage());
        assert_eq!(items[1].usage(), Some(&Usage::new(26, 12)));
    }

    #[tokio::test]
    async fn empty_stream_names_done_reason() {
        let server = MockServer::start().await;
        let mut last = line("", true);
        last["done_reason"] = json!("length");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{last}\n")))
            .mount(&server)
            .await;

        let items: Vec<_> = client(&server.uri())
            .stream("p", Some(&person()), &RequestOptions::new())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert_matches!(&items[0], Err(ClientError::ProviderProtocol { message }) if message.contains("length"));
    }

    #[tokio::test]
    async fn stream_error_line_ends_stream() {
        let server = MockServer::start().await;
        let body = format!("{}\n{}\n", line("{\"na", false), json!({"error": "out of memory"}));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let items: Vec<_> = client(&server.uri())
            .stream("p", Some(&person()), &RequestOptions::new())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert_matches!(&items[0], Err(ClientError::Api { message, .. }) if message == "out of memory");
    }
}
