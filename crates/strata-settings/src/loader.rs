//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`StrataSettings::default()`]
//! 2. If `~/.strata/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use strata_core::Provider;
use tracing::debug;

use crate::errors::Result;
use crate::types::StrataSettings;

/// Resolve the path to the settings file (`~/.strata/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".strata").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<StrataSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<StrataSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<StrataSettings> {
    let defaults = serde_json::to_value(StrataSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Credential variable for each provider.
fn credential_var(provider: Provider) -> Option<&'static str> {
    match provider {
        Provider::Google => Some("GOOGLE_API_KEY"),
        Provider::OpenAi => Some("OPENAI_API_KEY"),
        Provider::Mistral => Some("MISTRAL_API_KEY"),
        Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
        Provider::HuggingFace => Some("HUGGINGFACE_TOKEN"),
        Provider::Ollama => None,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut StrataSettings) {
    apply_overrides(settings, |name| {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    });
}

/// Apply overrides using an arbitrary variable lookup.
///
/// Recognised variables:
/// - `GOOGLE_API_KEY`, `OPENAI_API_KEY`, `MISTRAL_API_KEY`, `ANTHROPIC_API_KEY`,
///   `HUGGINGFACE_TOKEN`: provider credentials
/// - `OLLAMA_HOST`: Ollama base URL
/// - `STRATA_<PROVIDER>_BASE_URL`: base URL for any provider
/// - `STRATA_CONNECT_TIMEOUT_MS`: connect timeout (100..=600000)
/// - `STRATA_LOG_LEVEL`: default log filter
///
/// Invalid numeric values are ignored with a warning.
pub fn apply_overrides<F>(settings: &mut StrataSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for provider in Provider::ALL {
        let endpoint = settings.providers.endpoint_mut(provider);
        if let Some(var) = credential_var(provider) {
            if let Some(key) = lookup(var) {
                endpoint.api_key = Some(key);
            }
        }
        let base_var = format!("STRATA_{}_BASE_URL", provider.as_str().to_ascii_uppercase());
        if let Some(url) = lookup(&base_var) {
            endpoint.base_url = url;
        }
    }

    if let Some(host) = lookup("OLLAMA_HOST") {
        settings.providers.ollama.base_url = normalize_host(&host);
    }

    if let Some(val) = lookup("STRATA_CONNECT_TIMEOUT_MS") {
        match parse_u64_range(&val, 100, 600_000) {
            Some(ms) => settings.http.connect_timeout_ms = Some(ms),
            None => {
                tracing::warn!(key = "STRATA_CONNECT_TIMEOUT_MS", value = %val, "invalid u64 env var, ignoring");
            }
        }
    }

    if let Some(level) = lookup("STRATA_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

/// `OLLAMA_HOST` is commonly given without a scheme (`0.0.0.0:11434`).
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "providers": {"openai": {"baseUrl": "a", "apiKey": "k"}}
        });
        let source = serde_json::json!({
            "providers": {"openai": {"baseUrl": "b"}}
        });
        let merged = deep_merge(target, source);
        assert_eq!(merged["providers"]["openai"]["baseUrl"], "b");
        assert_eq!(merged["providers"]["openai"]["apiKey"], "k");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"stop": [1, 2, 3]});
        let source = serde_json::json!({"stop": [4]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["stop"], serde_json::json!([4]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn read_missing_file_returns_defaults() {
        let settings = read_settings_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(
            settings.providers.openai.base_url,
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn read_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"providers": {"anthropic": {"apiKey": "ak", "maxTokens": 2048}}}"#,
        )
        .unwrap();

        let settings = read_settings_file(&path).unwrap();
        assert_eq!(settings.providers.anthropic.endpoint.api_key.as_deref(), Some("ak"));
        assert_eq!(settings.providers.anthropic.max_tokens, 2048);
        assert_eq!(settings.providers.anthropic.api_version, "2023-06-01");
        assert_eq!(
            settings.providers.anthropic.endpoint.base_url,
            "https://api.anthropic.com/v1"
        );
    }

    #[test]
    fn read_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = read_settings_file(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn credentials_from_lookup() {
        let mut settings = StrataSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("OPENAI_API_KEY", "sk-1"),
                ("ANTHROPIC_API_KEY", "ak-1"),
                ("HUGGINGFACE_TOKEN", "hf-1"),
            ]),
        );
        assert_eq!(settings.providers.openai.api_key.as_deref(), Some("sk-1"));
        assert_eq!(settings.providers.anthropic.endpoint.api_key.as_deref(), Some("ak-1"));
        assert_eq!(settings.providers.huggingface.api_key.as_deref(), Some("hf-1"));
        assert!(settings.providers.google.api_key.is_none());
    }

    #[test]
    fn base_url_overrides() {
        let mut settings = StrataSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[("STRATA_MISTRAL_BASE_URL", "http://127.0.0.1:9000")]),
        );
        assert_eq!(settings.providers.mistral.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn ollama_host_gets_scheme() {
        let mut settings = StrataSettings::default();
        apply_overrides(&mut settings, lookup_from(&[("OLLAMA_HOST", "0.0.0.0:11434")]));
        assert_eq!(settings.providers.ollama.base_url, "http://0.0.0.0:11434");
    }

    #[test]
    fn invalid_timeout_ignored() {
        let mut settings = StrataSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[("STRATA_CONNECT_TIMEOUT_MS", "soon")]),
        );
        assert!(settings.http.connect_timeout_ms.is_none());

        apply_overrides(
            &mut settings,
            lookup_from(&[("STRATA_CONNECT_TIMEOUT_MS", "5000")]),
        );
        assert_eq!(settings.http.connect_timeout_ms, Some(5000));
    }

    #[test]
    fn log_level_override() {
        let mut settings = StrataSettings::default();
        apply_overrides(&mut settings, lookup_from(&[("STRATA_LOG_LEVEL", "debug")]));
        assert_eq!(settings.logging.level, "debug");
    }

    // ── parse_u64_range ─────────────────────────────────────────────

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("1000", 100, 600_000), Some(1000));
        assert_eq!(parse_u64_range("50", 100, 600_000), None);
        assert_eq!(parse_u64_range("700000", 100, 600_000), None);
        assert_eq!(parse_u64_range("abc", 100, 600_000), None);
    }
}
