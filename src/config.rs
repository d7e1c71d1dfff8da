//! Configuration module for Bible Chat

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::paths;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Bible Chat backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Platform name sent with subscription verification
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Store product ID of the premium subscription
    #[serde(default = "default_product_id")]
    pub product_id: String,

    /// Answers a free user gets before the paywall gate
    #[serde(default = "default_free_answer_limit")]
    pub free_answer_limit: u32,
}

fn default_backend_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_platform() -> String {
    "ios".to_string()
}

fn default_product_id() -> String {
    "com.yourorg.biblechat.premium.weekly".to_string()
}

fn default_free_answer_limit() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
            platform: default_platform(),
            product_id: default_product_id(),
            free_answer_limit: default_free_answer_limit(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.backend_url, "http://localhost:8001");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_and_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend_url = \"https://api.example.org\"\n").unwrap();

        let mut config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend_url, "https://api.example.org");
        assert_eq!(config.free_answer_limit, 3);

        config.free_answer_limit = 10;
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().free_answer_limit, 10);
    }
}
