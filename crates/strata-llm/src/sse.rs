//! # Line framing
//!
//! Vendors stream responses either as HTTP Server-Sent Events (`OpenAI`,
//! Mistral, Hugging Face, Anthropic, Google) or as newline-delimited JSON
//! (Ollama). Both are line-oriented, so one buffered splitter handles:
//! - Line buffering from chunked responses
//! - `data: ` prefix extraction and `[DONE]` filtering (SSE)
//! - Blank line skipping (NDJSON)
//! - Remaining buffer processing (configurable per provider)
//!
//! Read errors from the body end the stream with a transport error, and a
//! line that is not valid UTF-8 ends it with a protocol error.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::error::{ClientError, ClientResult};

/// Options for the line parsers.
#[derive(Clone, Copy, Debug)]
pub struct SseParserOptions {
    /// Whether to process remaining buffer content after the stream ends.
    /// Default: `true` (Google and Ollama may omit the final newline).
    pub process_remaining_buffer: bool,
}

impl Default for SseParserOptions {
    fn default() -> Self {
        Self {
            process_remaining_buffer: true,
        }
    }
}

/// Parse SSE lines from a byte stream and yield data payloads.
pub fn parse_sse_lines<S>(
    byte_stream: S,
    options: SseParserOptions,
) -> impl Stream<Item = ClientResult<String>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    split_lines(byte_stream, options, extract_sse_data)
}

/// Parse newline-delimited JSON from a byte stream and yield one document per line.
pub fn parse_ndjson_lines<S>(
    byte_stream: S,
    options: SseParserOptions,
) -> impl Stream<Item = ClientResult<String>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    split_lines(byte_stream, options, extract_ndjson_line)
}

fn split_lines<S>(
    byte_stream: S,
    options: SseParserOptions,
    extract: fn(&str) -> Option<String>,
) -> impl Stream<Item = ClientResult<String>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let process_remaining = options.process_remaining_buffer;

    futures::stream::unfold(
        (Box::pin(byte_stream), BytesMut::with_capacity(8192), false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                // Check buffer for a complete line (\n)
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        return Some((Err(invalid_utf8()), (stream, buffer, true)));
                    };

                    if let Some(data) = extract(line) {
                        return Some((Ok(data), (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => {
                        return Some((Err(ClientError::Transport(e)), (stream, buffer, true)));
                    }
                    None => {
                        if process_remaining && !buffer.is_empty() {
                            let data = match std::str::from_utf8(&buffer) {
                                Ok(line) => extract(line.trim()).map(Ok),
                                Err(_) => Some(Err(invalid_utf8())),
                            };
                            buffer.clear();
                            if let Some(data) = data {
                                return Some((data, (stream, buffer, true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

fn invalid_utf8() -> ClientError {
    ClientError::protocol("stream line is not valid UTF-8")
}

/// Extract data payload from an SSE line.
///
/// Returns `Some(data)` for valid data lines, `None` for comments,
/// empty lines, other fields, and `[DONE]` markers.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    Some(data.to_string())
}

fn extract_ndjson_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn collect_sse(chunks: Vec<&'static str>, options: SseParserOptions) -> Vec<String> {
        let stream = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, reqwest::Error>(Bytes::from(c))),
        );
        parse_sse_lines(stream, options)
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    // ── extract_sse_data ─────────────────────────────────────────────────

    #[test]
    fn extract_data_line() {
        assert_eq!(
            extract_sse_data("data: {\"type\":\"message\"}"),
            Some("{\"type\":\"message\"}".into())
        );
        assert_eq!(
            extract_sse_data("data:{\"type\":\"message\"}"),
            Some("{\"type\":\"message\"}".into())
        );
    }

    #[test]
    fn extract_skips_done_empty_and_comments() {
        assert_eq!(extract_sse_data("data: [DONE]"), None);
        assert_eq!(extract_sse_data("data: "), None);
        assert_eq!(extract_sse_data(""), None);
        assert_eq!(extract_sse_data(": keep-alive"), None);
    }

    #[test]
    fn extract_skips_non_data_field() {
        assert_eq!(extract_sse_data("event: message_start"), None);
        assert_eq!(extract_sse_data("id: 123"), None);
    }

    #[test]
    fn ndjson_skips_blank_lines() {
        assert_eq!(extract_ndjson_line("  "), None);
        assert_eq!(extract_ndjson_line("{\"done\":true}"), Some("{\"done\":true}".into()));
    }

    // ── parse_sse_lines ──────────────────────────────────────────────────

    #[tokio::test]
    async fn multiple_events_in_one_chunk() {
        let results = collect_sse(
            vec!["data: {\"a\":1}\n\ndata: {\"b\":2}\n\n"],
            SseParserOptions::default(),
        )
        .await;
        assert_eq!(results, ["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn event_split_across_chunks() {
        let results = collect_sse(
            vec!["data: {\"par", "tial\":true}\n\n"],
            SseParserOptions::default(),
        )
        .await;
        assert_eq!(results, ["{\"partial\":true}"]);
    }

    #[tokio::test]
    async fn named_events_and_done_marker() {
        let results = collect_sse(
            vec!["event: ping\ndata: {\"ok\":true}\r\n\r\ndata: [DONE]\n\n"],
            SseParserOptions::default(),
        )
        .await;
        assert_eq!(results, ["{\"ok\":true}"]);
    }

    #[tokio::test]
    async fn remaining_buffer_is_configurable() {
        let enabled = collect_sse(
            vec!["data: {\"trailing\":true}"],
            SseParserOptions {
                process_remaining_buffer: true,
            },
        )
        .await;
        assert_eq!(enabled, ["{\"trailing\":true}"]);

        let disabled = collect_sse(
            vec!["data: {\"trailing\":true}"],
            SseParserOptions {
                process_remaining_buffer: false,
            },
        )
        .await;
        assert!(disabled.is_empty());
    }

    #[tokio::test]
    async fn multibyte_split_across_chunks() {
        let bytes = "data: {\"n\":\"Zoë\"}\n\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let stream = futures::stream::iter(vec![
            Ok::<_, reqwest::Error>(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ]);
        let results: Vec<String> = parse_sse_lines(stream, SseParserOptions::default())
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(results, ["{\"n\":\"Zoë\"}"]);
    }

    #[tokio::test]
    async fn invalid_utf8_line_ends_stream_with_error() {
        let stream = futures::stream::iter(vec![Ok::<_, reqwest::Error>(Bytes::from_static(
            b"data: {\"a\":1}\n\ndata: {\"b\":\"\xff\"}\n\ndata: {\"c\":3}\n\n",
        ))]);
        let results: Vec<_> = parse_sse_lines(stream, SseParserOptions::default())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_deref().unwrap(), "{\"a\":1}");
        assert_matches!(&results[1], Err(ClientError::ProviderProtocol { message }) if message.contains("UTF-8"));
    }

    #[tokio::test]
    async fn invalid_utf8_in_remaining_buffer_is_an_error() {
        let stream = futures::stream::iter(vec![Ok::<_, reqwest::Error>(Bytes::from_static(
            b"{\"a\":1}\n{\"b\":\"\xfe\"}",
        ))]);
        let results: Vec<_> = parse_ndjson_lines(stream, SseParserOptions::default())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert_matches!(&results[1], Err(ClientError::ProviderProtocol { .. }));
    }

    // ── parse_ndjson_lines ───────────────────────────────────────────────

    #[tokio::test]
    async fn ndjson_lines_with_trailing_document() {
        let stream = futures::stream::iter(vec![
            Ok::<_, reqwest::Error>(Bytes::from("{\"a\":1}\n\n{\"b\"")),
            Ok(Bytes::from(":2}\n{\"done\":true}")),
        ]);
        let results: Vec<String> = parse_ndjson_lines(stream, SseParserOptions::default())
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(results, ["{\"a\":1}", "{\"b\":2}", "{\"done\":true}"]);
    }

    #[tokio::test]
    async fn empty_stream() {
        let results = collect_sse(vec![], SseParserOptions::default()).await;
        assert!(results.is_empty());
    }
}
