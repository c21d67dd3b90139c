//! Request and stream pipeline helpers shared by every provider.
//!
//! All providers follow the same pattern: send → check status → either read
//! one JSON body, or split the body into lines → decode each line → surface
//! vendor error events as errors. These helpers encapsulate that boilerplate.

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use strata_core::StructuredResponse;
use tracing::{debug, error, warn};

use crate::client::ResponseStream;
use crate::error::{ClientError, ClientResult};
use crate::error_parsing::{status_error, stream_error};
use crate::sse::{SseParserOptions, parse_ndjson_lines, parse_sse_lines};

/// Send a request and turn non-success statuses into errors.
pub(crate) async fn send(request: reqwest::RequestBuilder) -> ClientResult<reqwest::Response> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "vendor returned an error status");
        return Err(status_error(status.as_u16(), &body));
    }
    Ok(response)
}

/// Read a complete JSON response body into `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::protocol(format!("unexpected response body: {e}")))
}

/// Decode one framed line into an event, surfacing vendor error events.
fn decode_event<E: DeserializeOwned>(line: ClientResult<String>) -> ClientResult<E> {
    let line = line?;
    let value: Value = serde_json::from_str(&line).map_err(|e| {
        debug!(line = %line, "undecodable stream line");
        ClientError::protocol(format!("stream event is not JSON: {e}"))
    })?;
    if value.get("error").is_some_and(|e| !e.is_null()) {
        return Err(stream_error(&value));
    }
    serde_json::from_value(value)
        .map_err(|e| ClientError::protocol(format!("unexpected stream event: {e}")))
}

/// Typed events from an SSE response body.
pub(crate) fn sse_events<E>(
    response: reqwest::Response,
    options: SseParserOptions,
) -> impl Stream<Item = ClientResult<E>> + Send
where
    E: DeserializeOwned + Send + 'static,
{
    parse_sse_lines(response.bytes_stream(), options).map(decode_event::<E>)
}

/// Typed events from a newline-delimited JSON response body.
pub(crate) fn ndjson_events<E>(
    response: reqwest::Response,
    options: SseParserOptions,
) -> impl Stream<Item = ClientResult<E>> + Send
where
    E: DeserializeOwned + Send + 'static,
{
    parse_ndjson_lines(response.bytes_stream(), options).map(decode_event::<E>)
}

/// Box a chunk stream as a [`ResponseStream`].
pub(crate) fn boxed<S>(stream: S) -> ResponseStream
where
    S: Stream<Item = ClientResult<StructuredResponse>> + Send + 'static,
{
    Box::pin(stream)
}

/// Log a failed operation with its error category, then pass the result on.
pub(crate) fn log_outcome<T>(operation: &'static str, result: ClientResult<T>) -> ClientResult<T> {
    if let Err(e) = &result {
        error!(operation, category = e.category(), error = %e, "request failed");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
