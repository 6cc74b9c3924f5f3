//! Dispatcher Error Types
//!
//! Per-attempt failures are recorded and logged by the dispatcher; only
//! `NoProvidersAvailable` and `AllProvidersExhausted` reach callers of `dispatch`.

use crate::router::ProviderId;
use thiserror::Error;

/// Main error type for dispatcher operations
#[derive(Debug, Error)]
pub enum DispatchError {
    /// None of the requested providers has a configured key
    #[error("No AI provider available (requested: {})", format_providers(.requested))]
    NoProvidersAvailable { requested: Vec<ProviderId> },

    /// Transport failure or non-success HTTP status for one attempt
    #[error("{provider} request failed{}: {message}", format_status(.status))]
    ProviderRequestFailed {
        provider: ProviderId,
        status: Option<u16>,
        message: String,
    },

    /// The provider answered, but not with the expected completion field
    #[error("{provider} returned an unexpected response: {message}")]
    ProviderResponseMalformed { provider: ProviderId, message: String },

    /// Every available provider was attempted once and failed
    #[error("All AI providers failed (tried: {}): {}", format_providers(.attempted), format_last(.last_error))]
    AllProvidersExhausted {
        attempted: Vec<ProviderId>,
        last_error: Option<Box<DispatchError>>,
    },

    /// Configuration errors (unreadable settings file, unknown provider, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Build a request failure for `provider` from a transport error.
    pub fn transport(provider: ProviderId, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };

        DispatchError::ProviderRequestFailed {
            provider,
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }

    /// Build a malformed-response error for `provider`.
    pub fn malformed(provider: ProviderId, message: impl Into<String>) -> Self {
        DispatchError::ProviderResponseMalformed {
            provider,
            message: message.into(),
        }
    }

    /// Whether this error is one of the kinds surfaced by `dispatch`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DispatchError::NoProvidersAvailable { .. } | DispatchError::AllProvidersExhausted { .. }
        )
    }

    /// The provider a per-attempt error belongs to
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            DispatchError::ProviderRequestFailed { provider, .. }
            | DispatchError::ProviderResponseMalformed { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

fn format_providers(providers: &[ProviderId]) -> String {
    if providers.is_empty() {
        return "none".to_string();
    }
    providers
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

fn format_last(last: &Option<Box<DispatchError>>) -> String {
    match last {
        Some(err) => err.to_string(),
        None => "all providers failed".to_string(),
    }
}

/// Result type alias for dispatcher operations
pub type Result<T> = std::result::Result<T, DispatchError>;
