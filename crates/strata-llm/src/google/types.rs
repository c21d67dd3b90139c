//! Gemini wire types (responses only).

use serde::Deserialize;
use serde_json::Value;

/// `generateContent` response, also the shape of every streamed event.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidates; only the first is used.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Usage payload, kept raw for usage accounting.
    #[serde(default)]
    pub usage_metadata: Option<Value>,
    /// Set when the prompt itself was blocked.
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated answer text of the first candidate, skipping thoughts.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Block reason, when the prompt was rejected.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

/// One candidate.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content; absent when the candidate was filtered.
    #[serde(default)]
    pub content: Option<CandidateContent>,
    /// `STOP`, `MAX_TOKENS`, `SAFETY`, ...
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Candidate content.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CandidateContent {
    /// Parts in order.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One content part.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Part {
    /// Text, absent on non-text parts.
    #[serde(default)]
    pub text: Option<String>,
    /// Thought summary marker.
    #[serde(default)]
    pub thought: bool,
}

/// Prompt feedback.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Why the prompt was blocked.
    #[serde(default)]
    pub block_reason: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
