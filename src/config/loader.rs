//! Configuration Loader
//!
//! Handles loading and merging dispatcher settings from multiple sources.

use crate::config::settings::DispatcherSettings;
use crate::error::{DispatchError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit settings file
pub const SETTINGS_PATH_ENV: &str = "KEYRELAY_SETTINGS_PATH";

/// Settings loader with support for multiple sources
pub struct SettingsLoader {
    /// Merged settings tree; files are layered over the built-in defaults
    merged: Value,

    /// Files that contributed to `merged`, in load order
    sources: Vec<PathBuf>,
}

impl SettingsLoader {
    /// Create a new loader and load from default locations
    pub fn new() -> Result<Self> {
        let mut loader = Self::builtin()?;
        loader.load_from_default_paths()?;
        Ok(loader)
    }

    /// Create a loader with a specific settings file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::builtin()?;
        loader.load_from_file(path)?;
        Ok(loader)
    }

    /// Built-in defaults only
    fn builtin() -> Result<Self> {
        let merged = serde_json::to_value(DispatcherSettings::default()).map_err(|e| {
            DispatchError::Internal(format!("Failed to serialize default settings: {}", e))
        })?;

        Ok(Self {
            merged,
            sources: Vec::new(),
        })
    }

    /// Load settings from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_settings_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }
        Ok(())
    }

    /// Get list of settings paths to check, lowest precedence first
    fn get_settings_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".keyrelay").join("settings.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("keyrelay").join("settings.json"));
        }

        paths.push(PathBuf::from("keyrelay.json"));

        if let Ok(custom_path) = std::env::var(SETTINGS_PATH_ENV) {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    /// Load settings from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let overlay: Value = serde_json::from_str(&content).map_err(|e| {
            DispatchError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        if !overlay.is_object() {
            return Err(DispatchError::Config(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        }

        merge_values(&mut self.merged, overlay);
        self.sources.push(path.to_path_buf());
        tracing::debug!(path = %path.display(), "loaded settings file");
        Ok(())
    }

    /// Files that were loaded, in order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Deserialize and validate the merged settings
    pub fn into_settings(self) -> Result<DispatcherSettings> {
        let settings: DispatcherSettings = serde_json::from_value(self.merged).map_err(|e| {
            let origin = self
                .sources
                .last()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            DispatchError::Config(format!("Invalid settings ({}): {}", origin, e))
        })?;
        settings.validate()
    }
}

/// Merge `overlay` into `base`: objects merge key by key, anything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
