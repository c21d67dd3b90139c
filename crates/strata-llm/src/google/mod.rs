//! Google Gemini `generateContent` client.
//!
//! Structured output is requested with `responseMimeType: application/json`
//! and a `responseSchema` in Gemini's OpenAPI subset. List schemas are sent
//! as a bare `ARRAY`.

mod provider;
pub mod types;

pub use provider::GoogleClient;
