//! Anthropic Messages wire types (responses and SSE events).

use serde::Deserialize;
use serde_json::Value;

/// Non-streaming `/messages` response.
#[derive(Clone, Debug, Deserialize)]
pub struct MessagesResponse {
    /// Content blocks in order.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Why generation stopped.
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Usage payload, kept raw for usage accounting.
    #[serde(default)]
    pub usage: Option<Value>,
}

/// One response content block.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    /// Plain text.
    #[serde(rename = "text")]
    Text {
        /// Block text.
        #[serde(default)]
        text: String,
    },
    /// Tool call; `input` holds the structured result.
    #[serde(rename = "tool_use")]
    ToolUse {
        /// Tool name.
        name: String,
        /// Tool arguments.
        #[serde(default)]
        input: Value,
    },
    /// Thinking and any block type added later.
    #[serde(other)]
    Other,
}

/// Top-level SSE event.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// `message_start`, carrying input usage.
    #[serde(rename = "message_start")]
    MessageStart {
        /// The message shell.
        message: StreamMessage,
    },
    /// `content_block_delta`, carrying incremental text or tool input.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta {
        /// Block index.
        index: usize,
        /// The delta.
        delta: StreamDelta,
    },
    /// `message_delta`, carrying the stop reason and output usage.
    #[serde(rename = "message_delta")]
    MessageDelta {
        /// Usage update.
        #[serde(default)]
        usage: Option<Value>,
    },
    /// Block boundaries, `message_stop` and `ping`.
    #[serde(other)]
    Other,
}

/// Message object in `message_start`.
#[derive(Clone, Debug, Deserialize)]
pub struct StreamMessage {
    /// Usage so far.
    #[serde(default)]
    pub usage: Option<Value>,
}

/// Delta in `content_block_delta`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamDelta {
    /// Text fragment.
    #[serde(rename = "text_delta")]
    TextDelta {
        /// Text.
        text: String,
    },
    /// Tool input fragment.
    #[serde(rename = "input_json_delta")]
    InputJsonDelta {
        /// Partial JSON.
        partial_json: String,
    },
    /// Thinking and signature deltas.
    #[serde(other)]
    Other,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
