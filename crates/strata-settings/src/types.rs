//! Settings types.
//!
//! Every struct is `#[serde(default)]` so a settings file only needs to name
//! the values it changes.

use std::fmt;

use serde::{Deserialize, Serialize};
use strata_core::Provider;

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrataSettings {
    /// Per-provider endpoints and credentials.
    pub providers: ProvidersSettings,
    /// Shared HTTP client settings.
    pub http: HttpSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Endpoints and credentials for every provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersSettings {
    /// Google Gemini.
    pub google: ProviderSettings,
    /// `OpenAI`.
    pub openai: ProviderSettings,
    /// Mistral AI.
    pub mistral: ProviderSettings,
    /// Anthropic.
    pub anthropic: AnthropicSettings,
    /// Hugging Face router.
    pub huggingface: ProviderSettings,
    /// Ollama; `base_url` is the host, no key needed.
    pub ollama: ProviderSettings,
}

impl Default for ProvidersSettings {
    fn default() -> Self {
        Self {
            google: ProviderSettings::new("https://generativelanguage.googleapis.com/v1beta"),
            openai: ProviderSettings::new("https://api.openai.com/v1"),
            mistral: ProviderSettings::new("https://api.mistral.ai/v1"),
            anthropic: AnthropicSettings::default(),
            huggingface: ProviderSettings::new("https://router.huggingface.co/v1"),
            ollama: ProviderSettings::new("http://localhost:11434"),
        }
    }
}

impl ProvidersSettings {
    /// Endpoint settings for one provider.
    pub fn endpoint(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::Google => &self.google,
            Provider::OpenAi => &self.openai,
            Provider::Mistral => &self.mistral,
            Provider::Anthropic => &self.anthropic.endpoint,
            Provider::HuggingFace => &self.huggingface,
            Provider::Ollama => &self.ollama,
        }
    }

    /// Mutable endpoint settings for one provider.
    pub fn endpoint_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::Google => &mut self.google,
            Provider::OpenAi => &mut self.openai,
            Provider::Mistral => &mut self.mistral,
            Provider::Anthropic => &mut self.anthropic.endpoint,
            Provider::HuggingFace => &mut self.huggingface,
            Provider::Ollama => &mut self.ollama,
        }
    }
}

/// Where a provider lives and how to authenticate against it.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// API key or token. Absence is reported when a request is made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL without trailing slash.
    pub base_url: String,
}

impl ProviderSettings {
    /// Settings with a base URL and no key.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
        }
    }

    /// Builder-style key setter.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Base URL with any trailing slash removed.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Anthropic needs a version header and a mandatory `max_tokens`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnthropicSettings {
    /// Endpoint and key.
    #[serde(flatten)]
    pub endpoint: ProviderSettings,
    /// Value of the `anthropic-version` header.
    pub api_version: String,
    /// Default `max_tokens` when the request does not set one.
    pub max_tokens: u32,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            endpoint: ProviderSettings::new("https://api.anthropic.com/v1"),
            api_version: "2023-06-01".to_string(),
            max_tokens: 1024,
        }
    }
}

/// Shared HTTP client settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Connect timeout; `None` keeps the transport default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("strata/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_ms: None,
        }
    }
}

/// Logging settings.
///
/// The libraries never install a subscriber. A binary applies this by
/// passing `level` to `strata_core::logging::init_subscriber` (or the JSON
/// variant) once at startup, after loading settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive, e.g. `"warn"` or `"strata_llm=debug"`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_endpoints_but_no_keys() {
        let settings = StrataSettings::default();
        for p in Provider::ALL {
            let endpoint = settings.providers.endpoint(p);
            assert!(!endpoint.base_url.is_empty(), "{p}");
            assert!(endpoint.api_key.is_none(), "{p}");
        }
        assert_eq!(settings.providers.anthropic.max_tokens, 1024);
        assert_eq!(settings.providers.anthropic.api_version, "2023-06-01");
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn debug_redacts_api_key() {
        let endpoint = ProviderSettings::new("https://x").with_api_key("sk-secret");
        let rendered = format!("{endpoint:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn trimmed_base_url() {
        let endpoint = ProviderSettings::new("http://localhost:11434/");
        assert_eq!(endpoint.trimmed_base_url(), "http://localhost:11434");
    }

    #[test]
    fn anthropic_flattens_endpoint() {
        let json = serde_json::to_value(AnthropicSettings::default()).unwrap();
        assert_eq!(json["baseUrl"], "https://api.anthropic.com/v1");
        assert_eq!(json["apiVersion"], "2023-06-01");
    }

    #[test]
    fn endpoint_mut_targets_provider() {
        let mut providers = ProvidersSettings::default();
        providers.endpoint_mut(Provider::Anthropic).api_key = Some("k".into());
        assert_eq!(providers.anthropic.endpoint.api_key.as_deref(), Some("k"));
    }
}
