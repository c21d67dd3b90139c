//! Construction-time errors.
//!
//! Everything in here is raised before a request leaves the process: bad
//! schema definitions and unknown identifiers. The client layer folds these
//! into its configuration error kind.

use thiserror::Error;

/// Errors raised while building schemas or resolving identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A field type name was not recognised.
    #[error("unsupported field type `{type_name}` for field `{field}`")]
    UnknownFieldType {
        /// Field the type was declared on.
        field: String,
        /// The offending type name.
        type_name: String,
    },

    /// Two fields in one schema share a name.
    #[error("duplicate field `{0}` in schema")]
    DuplicateField(String),

    /// A field was declared with an empty name.
    #[error("field names must not be empty")]
    EmptyFieldName,

    /// A schema was built with no fields.
    #[error("schema `{0}` declares no fields")]
    NoFields(String),

    /// A schema was built with an empty name.
    #[error("schema name must not be empty")]
    EmptySchemaName,

    /// The provider identifier does not name a supported backend.
    #[error("unsupported provider `{0}`")]
    UnknownProvider(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
