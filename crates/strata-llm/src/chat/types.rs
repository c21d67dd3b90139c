//! Chat-completions wire types (responses only; requests are built as JSON).

use serde::Deserialize;
use serde_json::Value;

/// Non-streaming `/chat/completions` response.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatCompletion {
    /// Generated choices; only the first is used.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Usage payload, kept raw for usage accounting.
    #[serde(default)]
    pub usage: Option<Value>,
}

/// One choice of a non-streaming response.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
    /// Assistant message.
    pub message: ChatMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatMessage {
    /// Message text.
    #[serde(default)]
    pub content: Option<String>,
    /// Refusal text, set instead of content when the model declines.
    #[serde(default)]
    pub refusal: Option<String>,
}

/// One `chat.completion.chunk` SSE event.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatChunk {
    /// Delta choices; empty on the trailing usage-only chunk.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage payload, usually only on the last chunk.
    #[serde(default)]
    pub usage: Option<Value>,
}

/// One choice of a streamed chunk.
#[derive(Clone, Debug, Deserialize)]
pub struct ChunkChoice {
    /// Incremental message content.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Set on the last content chunk.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental message content.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text delta.
    #[serde(default)]
    pub content: Option<String>,
    /// Refusal delta.
    #[serde(default)]
    pub refusal: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
