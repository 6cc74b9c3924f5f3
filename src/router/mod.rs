//! Router Module
//!
//! Provider identifiers and per-provider API key pools.

pub mod key_pool;
pub mod provider;

pub use key_pool::{rotate, ApiKey, KeyPool, KeyPoolStats};
pub use provider::ProviderId;
