//! Dispatcher: the single entry point that turns a provider identifier into
//! a ready [`StructuredClient`].
//!
//! The dispatcher captures settings at construction and owns one shared
//! `reqwest::Client`. Each call to [`Dispatcher::client`] builds a fresh
//! provider client on top of that connection pool; clients are cheap and
//! hold no mutable state.

use std::sync::Arc;
use std::time::Duration;

use strata_core::{Provider, StructuredResponse};
use strata_settings::{ProvidersSettings, StrataSettings};
use tracing::{debug, info};

use crate::anthropic::AnthropicClient;
use crate::chat::{ChatClient, ChatFlavor};
use crate::client::{ResponseStream, StructuredClient, StructuredRequest};
use crate::error::{ClientError, ClientResult};
use crate::google::GoogleClient;
use crate::ollama::OllamaClient;

/// Factory and façade over every provider client.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    http: reqwest::Client,
    providers: ProvidersSettings,
}

impl Dispatcher {
    /// Build a dispatcher from loaded settings.
    pub fn new(settings: &StrataSettings) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(settings.http.user_agent.clone());
        if let Some(ms) = settings.http.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        let http = builder.build()?;
        info!(
            user_agent = %settings.http.user_agent,
            connect_timeout_ms = ?settings.http.connect_timeout_ms,
            "dispatcher initialized"
        );
        Ok(Self {
            http,
            providers: settings.providers.clone(),
        })
    }

    /// Resolve a provider identifier and model to a client.
    ///
    /// `model = None` selects the provider's default model. Unknown
    /// providers and blank model names fail with a configuration error
    /// before anything touches the network. Missing credentials are not
    /// checked here; they surface as [`ClientError::Auth`] on first use.
    pub fn client(
        &self,
        provider_id: &str,
        model: Option<&str>,
    ) -> ClientResult<Arc<dyn StructuredClient>> {
        let provider: Provider = provider_id.parse()?;
        let model = match model.map(str::trim) {
            Some("") => {
                return Err(ClientError::configuration(format!(
                    "empty model identifier for {provider}"
                )));
            }
            Some(model) => model,
            None => provider.default_model(),
        };
        debug!(%provider, model, "creating client");

        let http = self.http.clone();
        let endpoint = self.providers.endpoint(provider);
        let client: Arc<dyn StructuredClient> = match provider {
            Provider::OpenAi => Arc::new(ChatClient::new(ChatFlavor::OPENAI, http, endpoint, model)),
            Provider::Mistral => {
                Arc::new(ChatClient::new(ChatFlavor::MISTRAL, http, endpoint, model))
            }
            Provider::HuggingFace => {
                Arc::new(ChatClient::new(ChatFlavor::HUGGINGFACE, http, endpoint, model))
            }
            Provider::Anthropic => {
                Arc::new(AnthropicClient::new(http, &self.providers.anthropic, model))
            }
            Provider::Google => Arc::new(GoogleClient::new(http, endpoint, model)),
            Provider::Ollama => Arc::new(OllamaClient::new(http, endpoint, model)),
        };
        Ok(client)
    }

    /// Run one request to completion.
    pub async fn generate(&self, request: &StructuredRequest) -> ClientResult<StructuredResponse> {
        let client = self.client(&request.provider, request.model.as_deref())?;
        client
            .generate(&request.prompt, request.schema.as_ref(), &request.options)
            .await
    }

    /// Open a stream for one request.
    pub async fn stream(&self, request: &StructuredRequest) -> ClientResult<ResponseStream> {
        let client = self.client(&request.provider, request.model.as_deref())?;
        client
            .stream(&request.prompt, request.schema.as_ref(), &request.options)
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
