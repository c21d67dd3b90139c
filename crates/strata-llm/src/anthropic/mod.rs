//! Anthropic Messages API client.
//!
//! Anthropic has no response-format switch. Structured output is obtained by
//! declaring one tool whose input schema is the response schema and forcing
//! the model to call it; the tool input is the result.

mod provider;
pub mod types;

pub use provider::AnthropicClient;
