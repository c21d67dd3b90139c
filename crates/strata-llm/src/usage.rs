//! # Usage Accounting
//!
//! Each vendor reports token usage under different names:
//!
//! | provider | input | output | total |
//! |---|---|---|---|
//! | `OpenAI`, Mistral, Hugging Face | `prompt_tokens` | `completion_tokens` | `total_tokens` (trusted) |
//! | Anthropic | `input_tokens` | `output_tokens` | computed |
//! | Google | `promptTokenCount` | `candidatesTokenCount` | `totalTokenCount` (trusted) |
//! | Ollama | `prompt_eval_count` | `eval_count` | computed |
//!
//! Raw counters are read into [`UsageCounters`], merged across stream events
//! where a vendor spreads them out, and finally mapped to a canonical
//! [`Usage`]. A payload with no counters at all maps to `None`, never to a
//! zeroed record.

use serde::Deserialize;
use serde_json::Value;
use strata_core::{Provider, Usage};

/// Whether a vendor-supplied total is used as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TotalPolicy {
    /// Use the vendor total when present, else `input + output`.
    Trusted,
    /// Always `input + output`.
    Computed,
}

impl TotalPolicy {
    /// Policy for a provider.
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::OpenAi | Provider::Mistral | Provider::HuggingFace | Provider::Google => {
                Self::Trusted
            }
            Provider::Anthropic | Provider::Ollama => Self::Computed,
        }
    }
}

/// Chat-completions `usage` object.
#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

/// Anthropic `usage` object (`message_start.message.usage` / `message_delta.usage`).
#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

/// Gemini `usageMetadata`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

/// Ollama counters, found at the top level of the final response object.
#[derive(Debug, Default, Deserialize)]
struct OllamaUsage {
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

/// Raw token counters as read from one payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UsageCounters {
    /// Prompt-side tokens.
    pub input: Option<u64>,
    /// Generated tokens.
    pub output: Option<u64>,
    /// Vendor-supplied total.
    pub total: Option<u64>,
}

impl UsageCounters {
    /// Read counters from a provider-specific usage payload.
    ///
    /// Payloads of the wrong shape read as empty.
    pub fn from_payload(provider: Provider, payload: &Value) -> Self {
        match provider {
            Provider::OpenAi | Provider::Mistral | Provider::HuggingFace => {
                let u = ChatUsage::deserialize(payload).unwrap_or_default();
                Self {
                    input: u.prompt_tokens,
                    output: u.completion_tokens,
                    total: u.total_tokens,
                }
            }
            Provider::Anthropic => {
                let u = AnthropicUsage::deserialize(payload).unwrap_or_default();
                Self {
                    input: u.input_tokens,
                    output: u.output_tokens,
                    total: None,
                }
            }
            Provider::Google => {
                let u = GeminiUsage::deserialize(payload).unwrap_or_default();
                Self {
                    input: u.prompt_token_count,
                    output: u.candidates_token_count,
                    total: u.total_token_count,
                }
            }
            Provider::Ollama => {
                let u = OllamaUsage::deserialize(payload).unwrap_or_default();
                Self {
                    input: u.prompt_eval_count,
                    output: u.eval_count,
                    total: None,
                }
            }
        }
    }

    /// Whether no counter was present.
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none() && self.total.is_none()
    }

    /// Overlay a later observation: each counter present in `later` wins.
    pub fn merge(&mut self, later: Self) {
        self.input = later.input.or(self.input);
        self.output = later.output.or(self.output);
        self.total = later.total.or(self.total);
    }

    /// Map to a canonical record, or `None` when nothing was reported.
    pub fn into_usage(self, policy: TotalPolicy) -> Option<Usage> {
        if self.is_empty() {
            return None;
        }
        let input = self.input.unwrap_or(0);
        let output = self.output.unwrap_or(0);
        Some(match (policy, self.total) {
            (TotalPolicy::Trusted, Some(total)) => Usage::with_total(input, output, total),
            _ => Usage::new(input, output),
        })
    }
}

/// Map a provider-specific usage payload to a canonical record.
pub fn extract_usage(provider: Provider, payload: &Value) -> Option<Usage> {
    UsageCounters::from_payload(provider, payload).into_usage(TotalPolicy::for_provider(provider))
}

/// Collects usage spread over a stream.
#[derive(Clone, Debug)]
pub struct UsageAccumulator {
    provider: Provider,
    counters: UsageCounters,
}

impl UsageAccumulator {
    /// Empty accumulator for `provider`.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            counters: UsageCounters::default(),
        }
    }

    /// Record a usage payload seen in the stream.
    pub fn observe(&mut self, payload: &Value) {
        self.counters
            .merge(UsageCounters::from_payload(self.provider, payload));
    }

    /// Canonical usage for everything observed, if anything was.
    pub fn finish(&self) -> Option<Usage> {
        self.counters
            .into_usage(TotalPolicy::for_provider(self.provider))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
