//! # strata-core
//!
//! Foundation types shared by every strata crate.
//!
//! - **Schemas**: [`Schema`] is a runtime description of the expected output
//!   (ordered, typed fields; single object or list of objects), built through
//!   [`SchemaBuilder`]
//! - **Providers**: [`Provider`] identifies one of the supported vendor backends
//! - **Responses**: [`StructuredResponse`] is the provider-agnostic result of a
//!   request or of one stream chunk, carrying [`Content`] and an optional [`Usage`]
//! - **Errors**: [`CoreError`] for failures detected while constructing schemas
//!   and resolving identifiers, before any network call
//! - **Logging**: [`logging::init_subscriber`] for binaries and tests

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod provider;
pub mod response;
pub mod schema;

pub use errors::CoreError;
pub use provider::Provider;
pub use response::{Content, Metadata, StructuredResponse, Usage};
pub use schema::{Field, FieldType, Schema, SchemaBuilder, Shape};
