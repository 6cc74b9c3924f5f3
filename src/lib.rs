//! keyrelay - Multi-provider AI request dispatcher
//!
//! Holds a pool of API keys per provider, hands keys out round-robin, and
//! tries providers in the caller's order until one returns a completion.
//!
//! ```no_run
//! use keyrelay::{ProviderDispatcher, ProviderId};
//!
//! # async fn run() -> keyrelay::error::Result<()> {
//! let dispatcher = ProviderDispatcher::from_env()?;
//! let text = dispatcher
//!     .dispatch("Fix the grammar: me and him goes", &[ProviderId::Gemini, ProviderId::OpenAi], None)
//!     .await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod router;

pub use adapters::{AdapterRegistry, ProviderAdapter};
pub use config::{DispatcherSettings, KeySource, SettingsLoader};
pub use error::{DispatchError, Result};
pub use router::{KeyPool, KeyPoolStats, ProviderId};

use client::HttpClient;
use config::is_placeholder;

/// A single dispatch: prompt, optional system message, optional provider order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub prompt: String,
    pub system: Option<String>,

    /// Preferred order; `None` uses the dispatcher's default order
    pub providers: Option<Vec<ProviderId>>,
}

impl DispatchRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            providers: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_providers(mut self, providers: impl Into<Vec<ProviderId>>) -> Self {
        self.providers = Some(providers.into());
        self
    }
}

/// A successful dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Extracted completion text
    pub text: String,

    /// Provider that produced it
    pub provider: ProviderId,

    /// Providers attempted, including the successful one
    pub attempts: usize,
}

/// Key pools, rotation cursors and adapters for every provider.
///
/// Construct once and share (by reference or `Arc`); concurrent dispatches
/// share the rotation cursors without any further locking.
#[derive(Debug)]
pub struct ProviderDispatcher {
    /// One pool per provider, indexed by `ProviderId::index`
    pools: Vec<KeyPool>,

    /// Provider → adapter
    adapters: AdapterRegistry,

    /// Order used when a request names no providers
    default_order: Vec<ProviderId>,
}

impl ProviderDispatcher {
    /// Load settings from the default locations and keys from `.env` plus the
    /// process environment
    pub fn from_env() -> Result<Self> {
        let settings = SettingsLoader::new()?.into_settings()?;
        Self::from_settings(settings, &KeySource::from_env())
    }

    /// Build pools from `source` and the HTTP adapters from `settings`
    pub fn from_settings(settings: DispatcherSettings, source: &KeySource) -> Result<Self> {
        let settings = settings.validate()?;
        let http = HttpClient::new(settings.request_timeout(), settings.connect_timeout())?;

        let mut builder = Self::builder()
            .adapters(AdapterRegistry::with_defaults(&http, &settings))
            .default_order(settings.default_order.clone());

        for provider in ProviderId::ALL {
            let keys = source.keys_for(
                provider,
                &settings.env_prefix,
                settings.max_keys_per_provider,
            );
            builder = builder.keys(provider, keys);
        }

        let dispatcher = builder.build();
        for stats in dispatcher.stats() {
            info!(
                provider = %stats.provider,
                keys = stats.total_keys,
                "initialized key pool"
            );
        }
        Ok(dispatcher)
    }

    /// Start building a dispatcher with explicit keys and adapters
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    fn pool(&self, provider: ProviderId) -> &KeyPool {
        &self.pools[provider.index()]
    }

    /// Providers with at least one key, in canonical order
    pub fn available_providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.has_keys(*p))
            .collect()
    }

    /// Whether `provider` has at least one key
    pub fn has_keys(&self, provider: ProviderId) -> bool {
        !self.pool(provider).is_empty()
    }

    /// Draw the next key for `provider` (round-robin), or `None` if it has none
    pub fn next_key(&self, provider: ProviderId) -> Option<&str> {
        self.pool(provider).next_key().map(|k| k.value())
    }

    /// Current rotation cursor for `provider`; `None` when its pool is empty
    pub fn cursor(&self, provider: ProviderId) -> Option<usize> {
        self.pool(provider).stats().cursor
    }

    /// Pool statistics for every provider, in canonical order
    pub fn stats(&self) -> Vec<KeyPoolStats> {
        self.pools.iter().map(KeyPool::stats).collect()
    }

    /// Order used when a caller supplies none
    pub fn default_order(&self) -> &[ProviderId] {
        &self.default_order
    }

    /// Try `preferred` providers in order and return the first completion text.
    ///
    /// Providers without keys are skipped without any network call; each
    /// remaining provider gets exactly one attempt with a freshly drawn key.
    pub async fn dispatch(
        &self,
        prompt: &str,
        preferred: &[ProviderId],
        system: Option<&str>,
    ) -> Result<String> {
        self.run(prompt, preferred, system).await.map(|c| c.text)
    }

    /// Like [`dispatch`](Self::dispatch) using the default provider order
    pub async fn dispatch_default(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        self.run(prompt, &self.default_order, system)
            .await
            .map(|c| c.text)
    }

    /// Dispatch a request and report which provider answered
    pub async fn dispatch_request(&self, request: &DispatchRequest) -> Result<Completion> {
        let preferred = request
            .providers
            .as_deref()
            .unwrap_or(&self.default_order);
        self.run(&request.prompt, preferred, request.system.as_deref())
            .await
    }

    /// Preferred providers that have keys, first occurrence wins
    fn candidates(&self, preferred: &[ProviderId]) -> Vec<ProviderId> {
        let mut out: Vec<ProviderId> = Vec::with_capacity(preferred.len());
        for p in preferred {
            if self.has_keys(*p) && !out.contains(p) {
                out.push(*p);
            }
        }
        out
    }

    async fn run(
        &self,
        prompt: &str,
        preferred: &[ProviderId],
        system: Option<&str>,
    ) -> Result<Completion> {
        let candidates = self.candidates(preferred);
        if candidates.is_empty() {
            warn!(requested = ?preferred, "no configured provider among requested");
            return Err(DispatchError::NoProvidersAvailable {
                requested: preferred.to_vec(),
            });
        }

        let mut attempted = Vec::with_capacity(candidates.len());
        let mut last_error: Option<DispatchError> = None;

        for provider in candidates {
            let Some(adapter) = self.adapters.get(provider) else {
                warn!(%provider, "no adapter registered, skipping");
                last_error = Some(DispatchError::ProviderRequestFailed {
                    provider,
                    status: None,
                    message: "no adapter registered".to_string(),
                });
                continue;
            };

            let Some(key) = self.next_key(provider) else {
                debug!(%provider, "no key obtainable, skipping");
                continue;
            };

            attempted.push(provider);
            debug!(%provider, attempt = attempted.len(), "dispatching");

            match adapter.complete(key, prompt, system).await {
                Ok(text) => {
                    info!(%provider, attempts = attempted.len(), "provider answered");
                    return Ok(Completion {
                        text,
                        provider,
                        attempts: attempted.len(),
                    });
                }
                Err(e) => {
                    warn!(%provider, error = %e, "provider attempt failed, falling back");
                    last_error = Some(e);
                }
            }
        }

        error!(tried = ?attempted, "all providers failed");
        Err(DispatchError::AllProvidersExhausted {
            attempted,
            last_error: last_error.map(Box::new),
        })
    }
}

/// Builder for [`ProviderDispatcher`]
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    keys: HashMap<ProviderId, Vec<String>>,
    adapters: AdapterRegistry,
    default_order: Option<Vec<ProviderId>>,
}

impl DispatcherBuilder {
    /// Append keys for `provider`. Blank, placeholder and repeated values are dropped.
    pub fn keys<I, S>(mut self, provider: ProviderId, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = self.keys.entry(provider).or_default();
        for key in keys {
            let key: String = key.into();
            let key = key.trim();
            if key.is_empty() || is_placeholder(key) || pool.iter().any(|k| k == key) {
                continue;
            }
            pool.push(key.to_string());
        }
        self
    }

    /// Register an adapter, replacing any earlier one for the same provider
    pub fn adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.register(adapter);
        self
    }

    /// Replace the whole adapter registry
    pub fn adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Order used when a request names no providers
    pub fn default_order(mut self, order: Vec<ProviderId>) -> Self {
        self.default_order = Some(order);
        self
    }

    pub fn build(mut self) -> ProviderDispatcher {
        let pools = ProviderId::ALL
            .into_iter()
            .map(|p| KeyPool::new(p, self.keys.remove(&p).unwrap_or_default()))
            .collect();

        let default_order = match self.default_order {
            Some(order) if !order.is_empty() => order,
            _ => ProviderId::ALL.to_vec(),
        };

        ProviderDispatcher {
            pools,
            adapters: self.adapters,
            default_order,
        }
    }
}
