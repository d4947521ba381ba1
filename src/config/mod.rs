use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_ITEM_PREFIX;

/// Where relative endpoint paths point when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Optional colour overrides, as `#RRGGBB` or `#RGB`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ThemeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_dim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Origin the endpoint paths are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Prefix for generated item names
    #[serde(default = "default_item_prefix")]
    pub item_prefix: String,

    /// Only show the response of the most recently triggered action
    #[serde(default)]
    pub discard_stale: bool,

    #[serde(default)]
    pub theme: ThemeConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_item_prefix() -> String {
    DEFAULT_ITEM_PREFIX.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            item_prefix: default_item_prefix(),
            discard_stale: false,
            theme: ThemeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("stackprobe");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                tracing::warn!("{}; using default config", e);
                Ok(AppConfig::default())
            }
        }
    }

    /// Load config from `path`. A missing file is created with defaults; an
    /// unreadable or invalid one falls back to defaults and is left untouched.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config {}: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("Failed to read config {}: {}", path.display(), e),
            }
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        if let Err(e) = config.save_to(path) {
            tracing::warn!("Could not write default config: {}", e);
        }
        Ok(config)
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Could not create {}", dir.display()))?;
        }

        let mut clean_config = self.clone();
        clean_config.base_url = clean_config.base_url.trim().to_string();
        if clean_config.item_prefix.trim().is_empty() {
            clean_config.item_prefix = default_item_prefix();
        }

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)
            .with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }

    /// Apply command line overrides on top of the file values
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        self
    }
}
