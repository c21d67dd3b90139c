//! Shared API error response parsing across all providers.
//!
//! Handles the error envelopes vendors use:
//! - Standard: `{"error": {"message": "...", "type": "..."}}` (`OpenAI`, Anthropic, Mistral)
//! - Google:   `{"error": {"message": "...", "status": "..."}}`
//! - Flat:     `{"error": "..."}` (Ollama, Hugging Face)
//! - Detail:   `{"detail": "..."}` / `{"message": "..."}`

use serde_json::Value;

use crate::error::ClientError;

/// Parsed API error information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorInfo {
    /// Human-readable error message.
    pub message: String,
    /// Provider-specific error code (e.g., `"overloaded_error"`, `"NOT_FOUND"`).
    pub code: Option<String>,
}

/// Parse an error payload that is already JSON (response body or stream event).
pub fn parse_error_value(json: &Value) -> Option<ApiErrorInfo> {
    if let Some(msg) = json["error"]["message"].as_str() {
        let code = json["error"]["type"]
            .as_str()
            .or_else(|| json["error"]["status"].as_str())
            .or_else(|| json["error"]["code"].as_str())
            .map(String::from);
        return Some(ApiErrorInfo {
            message: msg.to_string(),
            code,
        });
    }

    if let Some(msg) = json["error"].as_str() {
        return Some(ApiErrorInfo {
            message: msg.to_string(),
            code: None,
        });
    }

    if let Some(msg) = json["detail"].as_str().or_else(|| json["message"].as_str()) {
        let code = json["code"]
            .as_str()
            .or_else(|| json["type"].as_str())
            .map(String::from);
        return Some(ApiErrorInfo {
            message: msg.to_string(),
            code,
        });
    }

    None
}

/// Parse an API error response body into structured error info.
///
/// Falls back to the raw body text if no known envelope matches.
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| parse_error_value(&json))
        .unwrap_or_else(|| ApiErrorInfo {
            message: format!("HTTP {status}: {body}"),
            code: None,
        })
}

/// Build the error for a non-success HTTP response.
///
/// 401 and 403 are credential problems; everything else is an API error.
pub fn status_error(status: u16, body: &str) -> ClientError {
    let info = parse_api_error(body, status);
    if status == 401 || status == 403 {
        return ClientError::Auth {
            message: info.message,
        };
    }
    ClientError::Api {
        status: Some(status),
        message: info.message,
        code: info.code,
    }
}

/// Build the error for an error event inside an otherwise successful stream.
pub fn stream_error(json: &Value) -> ClientError {
    let info = parse_error_value(json).unwrap_or_else(|| ApiErrorInfo {
        message: json.to_string(),
        code: None,
    });
    ClientError::Api {
        status: None,
        message: info.message,
        code: info.code,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn standard_format() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let info = parse_api_error(body, 529);
        assert_eq!(info.message, "Overloaded");
        assert_eq!(info.code.as_deref(), Some("overloaded_error"));
    }

    #[test]
    fn google_format() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let info = parse_api_error(body, 400);
        assert_eq!(info.message, "API key not valid");
        assert_eq!(info.code.as_deref(), Some("INVALID_ARGUMENT"));
    }

    #[test]
    fn flat_string_format() {
        let info = parse_api_error(r#"{"error":"model 'nope' not found"}"#, 404);
        assert_eq!(info.message, "model 'nope' not found");
        assert!(info.code.is_none());
    }

    #[test]
    fn detail_format() {
        let info = parse_api_error(r#"{"detail":"Not Found"}"#, 404);
        assert_eq!(info.message, "Not Found");
    }

    #[test]
    fn non_json_body() {
        let info = parse_api_error("Bad Gateway", 502);
        assert_eq!(info.message, "HTTP 502: Bad Gateway");
    }

    #[test]
    fn unrecognized_json_includes_body() {
        let info = parse_api_error(r#"{"weird":true}"#, 500);
        assert!(info.message.contains("weird"));
    }

    #[test]
    fn auth_statuses_map_to_auth() {
        let err = status_error(401, r#"{"error":{"message":"Incorrect API key"}}"#);
        assert_matches!(err, ClientError::Auth { ref message } if message == "Incorrect API key");
        assert_matches!(status_error(403, "forbidden"), ClientError::Auth { .. });
    }

    #[test]
    fn other_statuses_map_to_api() {
        let err = status_error(429, r#"{"error":{"message":"slow down","type":"rate_limit"}}"#);
        assert_matches!(
            err,
            ClientError::Api { status: Some(429), ref code, .. } if code.as_deref() == Some("rate_limit")
        );
    }

    #[test]
    fn stream_error_has_no_status() {
        let err = stream_error(&json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}));
        assert_matches!(err, ClientError::Api { status: None, ref message, .. } if message == "Overloaded");
    }
}
