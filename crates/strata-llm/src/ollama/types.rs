//! Ollama wire types (responses only).

use serde::Deserialize;
use serde_json::{Map, Value};

/// One `/api/chat` response object, also one NDJSON stream line.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    /// Assistant message (or its delta, when streaming).
    #[serde(default)]
    pub message: Option<ChatMessage>,
    /// Set on the last line.
    #[serde(default)]
    pub done: bool,
    /// `stop`, `length`, ... on the last line.
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Prompt tokens evaluated.
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Tokens generated.
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl ChatResponse {
    /// Message text, or the empty string.
    pub fn content(&self) -> &str {
        self.message.as_ref().map_or("", |m| m.content.as_str())
    }

    /// Usage counters as a payload for usage accounting; `None` when absent.
    pub fn usage_payload(&self) -> Option<Value> {
        let mut payload = Map::new();
        if let Some(n) = self.prompt_eval_count {
            let _ = payload.insert("prompt_eval_count".into(), n.into());
        }
        if let Some(n) = self.eval_count {
            let _ = payload.insert("eval_count".into(), n.into());
        }
        (!payload.is_empty()).then_some(Value::Object(payload))
    }
}

/// Assistant message.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatMessage {
    /// Message text.
    #[serde(default)]
    pub content: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
