//! Stream assembly.
//!
//! Vendors deliver output as text (or tool-argument) deltas. A
//! [`DeltaAssembler`] turns those deltas into [`StructuredResponse`] chunks
//! following one of two disciplines:
//!
//! - [`Discipline::Snapshot`]: after each delta the growing buffer is repaired
//!   into the best current parse; a chunk is yielded whenever that parse
//!   validates and differs from the last one yielded.
//! - [`Discipline::Accumulate`]: deltas are buffered and the buffer is parsed
//!   once when the stream ends.
//!
//! Without a schema every non-empty delta is yielded as raw text.

use strata_core::{Content, Provider, Schema, StructuredResponse, Usage};
use tracing::debug;

use crate::adapter::ListPacking;
use crate::error::ClientResult;
use crate::normalize::{normalize_text, normalize_value};
use crate::partial::repair_prefix;

/// How partial output is surfaced while streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// Yield a validated snapshot whenever the parse improves.
    Snapshot,
    /// Parse once, at the end.
    Accumulate,
}

/// Builds response chunks from a sequence of deltas.
#[derive(Debug)]
pub struct DeltaAssembler {
    provider: Provider,
    model: String,
    schema: Option<Schema>,
    packing: ListPacking,
    discipline: Discipline,
    buffer: String,
    last: Option<Content>,
}

impl DeltaAssembler {
    /// New assembler for one stream.
    pub fn new(
        provider: Provider,
        model: &str,
        schema: Option<Schema>,
        packing: ListPacking,
        discipline: Discipline,
    ) -> Self {
        Self {
            provider,
            model: model.to_string(),
            schema,
            packing,
            discipline,
            buffer: String::new(),
            last: None,
        }
    }

    /// Feed one delta; returns a chunk when there is something new to show.
    pub fn push(&mut self, delta: &str) -> Option<StructuredResponse> {
        if delta.is_empty() {
            return None;
        }
        let Some(schema) = &self.schema else {
            return Some(self.chunk(Content::Text(delta.to_string())));
        };
        self.buffer.push_str(delta);
        if self.discipline == Discipline::Accumulate {
            return None;
        }

        let snapshot = repair_prefix(&self.buffer)?;
        match normalize_value(snapshot, schema, self.packing) {
            Ok(content) if self.last.as_ref() != Some(&content) => {
                self.last = Some(content.clone());
                Some(self.chunk(content))
            }
            Ok(_) => None,
            Err(e) => {
                debug!(provider = %self.provider, error = %e, "snapshot not yet valid");
                None
            }
        }
    }

    /// Close the stream: validate the full buffer strictly.
    ///
    /// Yields a final chunk unless it would repeat the last snapshot. Empty
    /// output under a schema is a protocol error; invalid output is a
    /// validation error.
    pub fn finish(&mut self) -> ClientResult<Option<StructuredResponse>> {
        let Some(schema) = &self.schema else {
            return Ok(None);
        };
        let content = normalize_text(&self.buffer, schema, self.packing)?;
        if self.last.as_ref() == Some(&content) {
            return Ok(None);
        }
        self.last = Some(content.clone());
        Ok(Some(self.chunk(content)))
    }

    /// The terminal usage-only chunk, when usage was reported.
    pub fn usage_chunk(&self, usage: Option<Usage>) -> Option<StructuredResponse> {
        usage.map(|u| StructuredResponse::final_usage(self.provider, &self.model, u))
    }

    fn chunk(&self, content: Content) -> StructuredResponse {
        StructuredResponse::stream_chunk(self.provider, &self.model, content)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
