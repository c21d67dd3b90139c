//! # strata-llm
//!
//! Structured output over multiple LLM vendors.
//!
//! A caller describes the expected output once as a [`Schema`] and picks a
//! provider by name; the [`Dispatcher`] hands back a [`StructuredClient`]
//! that shapes the request for that vendor and returns a provider-agnostic
//! [`StructuredResponse`]:
//! - Schema adapter: JSON schema, Gemini OpenAPI schema, forced-tool
//!   definition and the list wrap/unwrap pair ([`adapter`])
//! - Response normalizer: fence stripping, lax coercion, strict validation
//!   with per-field issues ([`normalize`]) and partial-JSON repair for
//!   streamed snapshots ([`partial`])
//! - Usage accounting across the vendors' counter names ([`usage`])
//! - SSE / NDJSON line framing shared by every stream ([`sse`])
//! - One client per wire protocol: chat completions (`OpenAI`, Mistral,
//!   Hugging Face), Anthropic, Google and Ollama
//!
//! Logging goes through `tracing`. A binary loads settings and installs a
//! subscriber before building the dispatcher:
//!
//! ```ignore
//! let settings = strata_settings::load_settings()?;
//! strata_core::logging::init_subscriber(&settings.logging.level);
//! let dispatcher = strata_llm::Dispatcher::new(&settings)?;
//! ```
//!
//! [`Schema`]: strata_core::Schema
//! [`StructuredResponse`]: strata_core::StructuredResponse

#![deny(unsafe_code)]

pub mod adapter;
pub mod anthropic;
pub mod assemble;
pub mod chat;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod error_parsing;
pub mod google;
pub mod normalize;
pub mod ollama;
pub mod partial;
pub mod sse;
mod stream_pipeline;
pub mod usage;

pub use adapter::ListPacking;
pub use client::{RequestOptions, ResponseStream, StructuredClient, StructuredRequest};
pub use dispatcher::Dispatcher;
pub use error::{ClientError, ClientResult, ValidationIssue};
