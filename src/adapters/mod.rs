//! Provider Adapters
//!
//! One adapter per vendor. Each builds that vendor's request, sends it with a
//! single key, and extracts the first textual completion from its response.
//! The dispatcher only ever sees the uniform [`ProviderAdapter`] signature.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod perplexity;

use crate::client::HttpClient;
use crate::config::DispatcherSettings;
use crate::error::{DispatchError, Result};
use crate::router::ProviderId;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::ChatCompletionsAdapter;

/// A vendor request adapter.
///
/// Input is one key, the prompt and an optional system message; output is the
/// extracted completion text. Transport and HTTP failures are reported as
/// `ProviderRequestFailed`, unexpected response shapes as
/// `ProviderResponseMalformed`.
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter talks to
    fn provider(&self) -> ProviderId;

    /// Perform exactly one request
    fn complete<'a>(
        &'a self,
        key: &'a str,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String>>;
}

/// Model and sampling parameters shared by every adapter
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    /// Resolve parameters for `provider` from settings
    pub fn from_settings(settings: &DispatcherSettings, provider: ProviderId) -> Self {
        let endpoint = settings.endpoint(provider);
        Self {
            base_url: endpoint.base_url,
            model: endpoint.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

/// Mapping from provider to its adapter, fixed once the dispatcher is built
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in HTTP adapter for every provider
    pub fn with_defaults(http: &HttpClient, settings: &DispatcherSettings) -> Self {
        let mut registry = Self::new();
        for provider in ProviderId::ALL {
            let params = GenerationParams::from_settings(settings, provider);
            let adapter: Arc<dyn ProviderAdapter> = match provider {
                ProviderId::Gemini => Arc::new(GeminiAdapter::new(http.clone(), params)),
                ProviderId::OpenAi => Arc::new(ChatCompletionsAdapter::openai(http.clone(), params)),
                ProviderId::Anthropic => Arc::new(AnthropicAdapter::new(http.clone(), params)),
                ProviderId::Perplexity => Arc::new(perplexity::adapter(http.clone(), params)),
            };
            registry.register(adapter);
        }
        registry
    }

    /// Register (or replace) the adapter for its provider
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    /// Adapter for `provider`, if one is registered
    pub fn get(&self, provider: ProviderId) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider)
    }

    /// Providers with an adapter, in canonical order
    pub fn providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.adapters.contains_key(p))
            .collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

/// Reject completions that carry no visible text
pub(crate) fn non_empty(provider: ProviderId, text: Option<String>, field: &str) -> Result<String> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        Some(_) => Err(DispatchError::malformed(
            provider,
            format!("{} is empty", field),
        )),
        None => Err(DispatchError::malformed(
            provider,
            format!("missing {}", field),
        )),
    }
}

/// Decode a JSON value into a typed response, mapping failure to a shape error
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: ProviderId,
    value: serde_json::Value,
) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| DispatchError::malformed(provider, format!("unexpected JSON shape: {}", e)))
}
