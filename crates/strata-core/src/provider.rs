//! Provider identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A supported vendor backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini.
    Google,
    /// `OpenAI` chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Mistral AI.
    Mistral,
    /// Anthropic Claude.
    Anthropic,
    /// Hugging Face inference router.
    #[serde(rename = "huggingface")]
    HuggingFace,
    /// Local Ollama server.
    Ollama,
}

impl Provider {
    /// Every supported provider, in display order.
    pub const ALL: [Self; 6] = [
        Self::Google,
        Self::OpenAi,
        Self::Mistral,
        Self::Anthropic,
        Self::HuggingFace,
        Self::Ollama,
    ];

    /// Stable identifier used in configuration and requests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenAi => "openai",
            Self::Mistral => "mistral",
            Self::Anthropic => "anthropic",
            Self::HuggingFace => "huggingface",
            Self::Ollama => "ollama",
        }
    }

    /// Model used when the caller does not pick one.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Google => "gemini-2.5-flash-lite-preview-06-17",
            Self::OpenAi => "o4-mini-2025-04-16",
            Self::Mistral => "mistral-small-latest",
            Self::Anthropic => "claude-3-7-sonnet-20250219",
            Self::HuggingFace => "google/gemma-2-2b-it",
            Self::Ollama => "llama3.2",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| CoreError::UnknownProvider(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
