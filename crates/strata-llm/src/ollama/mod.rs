//! Ollama `/api/chat` client.
//!
//! Ollama takes a JSON schema directly in the `format` field and streams
//! newline-delimited JSON. Token counts arrive only on the final `done` line.

mod provider;
pub mod types;

pub use provider::OllamaClient;
