//! Configuration Module
//!
//! Settings loading and credential collection.

pub mod keys;
pub mod loader;
pub mod settings;

pub use keys::{is_placeholder, KeySource};
pub use loader::SettingsLoader;
pub use settings::{DispatcherSettings, ProviderEndpoint, ProviderSettings};
