//! API Key Pool Management
//!
//! Holds the ordered credentials for one provider and hands them out in
//! round-robin order. The pool itself is immutable after construction; only
//! the rotation cursor and the per-key draw counters move.

use crate::router::ProviderId;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A single API key with usage tracking
pub struct ApiKey {
    /// The actual API key value
    value: String,

    /// Number of times this key has been drawn
    draw_count: AtomicU64,
}

impl ApiKey {
    /// Create a new API key
    pub fn new(value: String) -> Self {
        Self {
            value,
            draw_count: AtomicU64::new(0),
        }
    }

    /// Get the key value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Record a draw of this key
    fn record_draw(&self) {
        self.draw_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the draw count
    pub fn draw_count(&self) -> u64 {
        self.draw_count.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &redact(&self.value))
            .field("draw_count", &self.draw_count())
            .finish()
    }
}

/// Mask all but the first four characters of a credential
pub fn redact(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

/// One round-robin step: returns the index to use now and the cursor after it,
/// or `None` for an empty pool.
pub fn rotate(cursor: usize, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let index = cursor % len;
    Some((index, (index + 1) % len))
}

/// Pool of API keys with round-robin rotation
#[derive(Debug)]
pub struct KeyPool {
    /// Provider this pool belongs to
    provider: ProviderId,

    /// Keys in draw order
    keys: Vec<ApiKey>,

    /// Index of the next key to hand out, always `< keys.len()` when non-empty
    cursor: AtomicUsize,
}

impl KeyPool {
    /// Create a new key pool
    pub fn new(provider: ProviderId, keys: Vec<String>) -> Self {
        Self {
            provider,
            keys: keys.into_iter().map(ApiKey::new).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Create an empty pool
    pub fn empty(provider: ProviderId) -> Self {
        Self::new(provider, Vec::new())
    }

    /// Get the provider
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Get the number of keys in the pool
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Current cursor position (the index the next draw will return)
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Draw the key at the cursor and advance the cursor.
    ///
    /// The read-and-advance is a single atomic step: concurrent callers may
    /// see overlapping keys across calls, but the cursor never skips or
    /// double-advances.
    pub fn next_key(&self) -> Option<&ApiKey> {
        let len = self.keys.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                rotate(c, len).map(|(_, next)| next)
            })
            .ok()?;
        let (index, _) = rotate(previous, len)?;

        let key = &self.keys[index];
        key.record_draw();
        tracing::debug!(provider = %self.provider, index, pool_size = len, "drew API key");
        Some(key)
    }

    /// Iterate over the keys in draw order
    pub fn keys(&self) -> impl Iterator<Item = &ApiKey> {
        self.keys.iter()
    }

    /// Get statistics about the pool
    pub fn stats(&self) -> KeyPoolStats {
        KeyPoolStats {
            provider: self.provider,
            total_keys: self.keys.len(),
            cursor: if self.keys.is_empty() {
                None
            } else {
                Some(self.cursor())
            },
            total_draws: self.keys.iter().map(|k| k.draw_count()).sum(),
        }
    }
}

/// Statistics about a key pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPoolStats {
    pub provider: ProviderId,
    pub total_keys: usize,
    pub cursor: Option<usize>,
    pub total_draws: u64,
}
