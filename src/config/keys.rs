//! Credential Sources
//!
//! Turns a flat name → value mapping (process environment, `.env` file, or an
//! explicit table) into one ordered key list per provider.

use crate::router::ProviderId;
use std::collections::HashMap;

/// Flat mapping of environment-style names to values, captured once
#[derive(Debug, Clone, Default)]
pub struct KeySource {
    vars: HashMap<String, String>,
}

impl KeySource {
    /// Empty source; every provider ends up unavailable
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `.env` (if present) overlaid with the process environment.
    ///
    /// The process environment itself is not modified.
    pub fn from_env() -> Self {
        let mut vars = HashMap::new();

        match dotenvy::dotenv_iter() {
            Ok(iter) => {
                for item in iter {
                    match item {
                        Ok((name, value)) => {
                            vars.insert(name, value);
                        }
                        Err(e) => tracing::warn!("skipping malformed .env entry: {}", e),
                    }
                }
            }
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("failed to read .env: {}", e),
        }

        for (name, value) in std::env::vars_os() {
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    vars.insert(name, value);
                }
                (Ok(name), Err(_)) => {
                    tracing::debug!(name = %name, "skipping environment variable with non-UTF-8 value")
                }
                (Err(name), _) => {
                    tracing::debug!(name = ?name, "skipping environment variable with non-UTF-8 name")
                }
            }
        }
        Self { vars }
    }

    /// Build from explicit name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a raw value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Collect the usable keys for one provider.
    ///
    /// Reads `<prefix><STEM>_API_KEY_1` through `_<max_keys>` in order, then
    /// puts the legacy `<prefix><STEM>_API_KEY` value first unless it is
    /// already present. Blank and placeholder values are skipped, as are
    /// repeats of an earlier numbered key.
    pub fn keys_for(&self, provider: ProviderId, prefix: &str, max_keys: usize) -> Vec<String> {
        let stem = provider.env_stem();
        let mut keys: Vec<String> = Vec::new();

        for n in 1..=max_keys {
            let name = format!("{}{}_API_KEY_{}", prefix, stem, n);
            if let Some(value) = self.usable(&name) {
                if !keys.iter().any(|k| k == value) {
                    keys.push(value.to_string());
                }
            }
        }

        let legacy = format!("{}{}_API_KEY", prefix, stem);
        if let Some(value) = self.usable(&legacy) {
            if !keys.iter().any(|k| k == value) {
                keys.insert(0, value.to_string());
            }
        }

        keys
    }

    /// Trimmed value for `name`, if it is set to something real
    fn usable(&self, name: &str) -> Option<&str> {
        let value = self.get(name)?.trim();
        if value.is_empty() || is_placeholder(value) {
            if !value.is_empty() {
                tracing::debug!(name, "ignoring placeholder credential");
            }
            return None;
        }
        Some(value)
    }
}

/// Whether `value` is a template placeholder such as `your_gemini_api_key_3_here`.
///
/// Accepts the numbered and unnumbered forms for every known provider,
/// case-insensitively.
pub fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    let Some(inner) = lower
        .strip_prefix("your_")
        .and_then(|rest| rest.strip_suffix("_here"))
    else {
        return false;
    };

    ProviderId::ALL.iter().any(|p| {
        let Some(rest) = inner
            .strip_prefix(p.as_str())
            .and_then(|r| r.strip_prefix("_api_key"))
        else {
            return false;
        };
        match rest.strip_prefix('_') {
            None => rest.is_empty(),
            Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        }
    })
}
