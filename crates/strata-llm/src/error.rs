//! Error taxonomy for structured-output clients.
//!
//! Every failure a caller can see is one [`ClientError`]. Nothing is retried
//! or downgraded to a default value on the way up.

use std::fmt;

use strata_core::CoreError;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// One problem found while validating output against a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `age` or `[1].age`. `$` is the root.
    pub path: String,
    /// What was wrong with it.
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an issue at the root of the payload.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("$", message)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Errors that can occur while building or executing a structured request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Unknown provider or model, bad schema definition, or a client that
    /// could not be built. Raised before any network call.
    #[error("configuration error: {message}")]
    Configuration {
        /// Error description.
        message: String,
    },

    /// Network or connection failure, passed through untranslated.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Vendor output did not conform to the requested schema.
    #[error("schema validation failed: {}", join_issues(.issues))]
    SchemaValidation {
        /// Every issue found, in document order.
        issues: Vec<ValidationIssue>,
    },

    /// Vendor response did not have the shape the client expected.
    #[error("provider protocol error: {message}")]
    ProviderProtocol {
        /// Error description.
        message: String,
    },

    /// Credentials missing at first use, or rejected by the vendor.
    #[error("auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Vendor answered with a non-success status or an in-stream error event.
    #[error("API error{}: {message}", status_suffix(.status))]
    Api {
        /// HTTP status code; `None` for errors reported inside a stream.
        status: Option<u16>,
        /// Error description.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
    },
}

impl ClientError {
    /// Shorthand for [`ClientError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for [`ClientError::ProviderProtocol`].
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProviderProtocol {
            message: message.into(),
        }
    }

    /// Shorthand for a validation failure with a single issue.
    pub fn validation(issue: ValidationIssue) -> Self {
        Self::SchemaValidation {
            issues: vec![issue],
        }
    }

    /// Append the vendor's stop reason to a protocol error.
    ///
    /// Other errors, and protocol errors without a reason, pass through.
    #[must_use]
    pub fn with_stop_reason(self, reason: Option<&str>) -> Self {
        match (self, reason) {
            (Self::ProviderProtocol { message }, Some(reason)) => Self::ProviderProtocol {
                message: format!("{message} (stop reason: {reason})"),
            },
            (err, _) => err,
        }
    }

    /// Validation issues, when this is a [`ClientError::SchemaValidation`].
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::SchemaValidation { issues } => issues,
            _ => &[],
        }
    }

    /// Error category string for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Transport(_) => "network",
            Self::SchemaValidation { .. } => "schema",
            Self::ProviderProtocol { .. } => "protocol",
            Self::Auth { .. } => "auth",
            Self::Api { .. } => "api",
        }
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        Self::configuration(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
