//! # Chat-completions clients
//!
//! `OpenAI`, Mistral and the Hugging Face router speak the same
//! chat-completions wire format. One client serves all three; a
//! [`ChatFlavor`] records where they differ (schema enforcement, list
//! packing, streaming discipline).

mod provider;
pub mod types;

pub use provider::{ChatClient, ChatFlavor, Enforcement};
