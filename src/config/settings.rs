//! Dispatcher Settings
//!
//! Defines the JSON settings schema: where each vendor lives, which model to
//! ask, request limits, and how credentials are named in the environment.

use crate::error::{DispatchError, Result};
use crate::router::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Numbered keys read per provider (`..._API_KEY_1` through `..._API_KEY_10`)
pub const DEFAULT_MAX_KEYS: usize = 10;

/// Upper bound on `max_keys_per_provider`; each slot is one env lookup per provider
pub const MAX_KEYS_LIMIT: usize = 100;

/// Root settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherSettings {
    /// Prefix prepended to every credential name (e.g. "VITE_")
    pub env_prefix: String,

    /// Highest numeric suffix read for each provider
    pub max_keys_per_provider: usize,

    /// Provider order used when a caller does not supply one
    pub default_order: Vec<ProviderId>,

    /// Whole-request timeout for one provider attempt
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout
    pub connect_timeout_secs: u64,

    /// Completion length limit sent to vendors that accept one
    pub max_tokens: u32,

    /// Sampling temperature sent to every vendor
    pub temperature: f32,

    /// Per-provider endpoint and model overrides
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub providers: HashMap<ProviderId, ProviderSettings>,
}

/// Overrides for a single provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// Base URL replacing the vendor default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model replacing the vendor default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Fully resolved endpoint for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub model: String,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            env_prefix: String::new(),
            max_keys_per_provider: DEFAULT_MAX_KEYS,
            default_order: ProviderId::ALL.to_vec(),
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            max_tokens: 1024,
            temperature: 0.7,
            providers: HashMap::new(),
        }
    }
}

impl DispatcherSettings {
    /// Check value ranges and normalize the default order
    pub fn validate(mut self) -> Result<Self> {
        if self.max_keys_per_provider == 0 {
            return Err(DispatchError::Config(
                "max_keys_per_provider must be at least 1".to_string(),
            ));
        }
        if self.max_keys_per_provider > MAX_KEYS_LIMIT {
            return Err(DispatchError::Config(format!(
                "max_keys_per_provider {} exceeds the limit of {}",
                self.max_keys_per_provider, MAX_KEYS_LIMIT
            )));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(DispatchError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DispatchError::Config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(DispatchError::Config(
                "max_tokens must be at least 1".to_string(),
            ));
        }

        let mut seen = Vec::with_capacity(self.default_order.len());
        for p in self.default_order.drain(..) {
            if !seen.contains(&p) {
                seen.push(p);
            }
        }
        if seen.is_empty() {
            seen = ProviderId::ALL.to_vec();
        }
        self.default_order = seen;

        Ok(self)
    }

    /// Resolve the base URL and model for a provider
    pub fn endpoint(&self, provider: ProviderId) -> ProviderEndpoint {
        let overrides = self.providers.get(&provider);
        ProviderEndpoint {
            base_url: overrides
                .and_then(|o| o.base_url.clone())
                .unwrap_or_else(|| default_base_url(provider).to_string())
                .trim_end_matches('/')
                .to_string(),
            model: overrides
                .and_then(|o| o.model.clone())
                .unwrap_or_else(|| default_model(provider).to_string()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Public API host for each vendor
pub fn default_base_url(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Gemini => "https://generativelanguage.googleapis.com",
        ProviderId::OpenAi => "https://api.openai.com",
        ProviderId::Anthropic => "https://api.anthropic.com",
        ProviderId::Perplexity => "https://api.perplexity.ai",
    }
}

/// Model requested from each vendor unless overridden
pub fn default_model(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Gemini => "gemini-1.5-flash",
        ProviderId::OpenAi => "gpt-4o-mini",
        ProviderId::Anthropic => "claude-3-haiku-20240307",
        ProviderId::Perplexity => "llama-3.1-sonar-small-128k-online",
    }
}
