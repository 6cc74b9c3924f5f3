//! Provider Identifiers
//!
//! The closed set of AI vendors the dispatcher can route to.

use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An external AI text-completion vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Perplexity,
}

impl ProviderId {
    /// All providers in canonical order
    pub const ALL: [ProviderId; 4] = [
        ProviderId::Gemini,
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Perplexity,
    ];

    /// Lowercase wire name (e.g. "openai")
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Perplexity => "perplexity",
        }
    }

    /// Uppercase stem used in environment variable names (e.g. `GEMINI_API_KEY_1`)
    pub fn env_stem(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "GEMINI",
            ProviderId::OpenAi => "OPENAI",
            ProviderId::Anthropic => "ANTHROPIC",
            ProviderId::Perplexity => "PERPLEXITY",
        }
    }

    /// Human-readable name for logs and CLI output
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "Google Gemini",
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Anthropic => "Anthropic",
            ProviderId::Perplexity => "Perplexity",
        }
    }

    /// Position in canonical order
    pub fn index(&self) -> usize {
        match self {
            ProviderId::Gemini => 0,
            ProviderId::OpenAi => 1,
            ProviderId::Anthropic => 2,
            ProviderId::Perplexity => 3,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| {
                DispatchError::Config(format!(
                    "Unknown provider '{}'. Expected one of: gemini, openai, anthropic, perplexity",
                    s
                ))
            })
    }
}
