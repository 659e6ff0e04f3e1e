//! Configuration Management
//!
//! Handles persistent configuration storage for the `vra` CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::poll::PollPolicy;
use crate::resource::fetcher::DEFAULT_PAGE_SIZE;

/// Environment variable overriding the appliance URL
pub const URL_ENV: &str = "VRA_URL";
/// Environment variable overriding the bearer token
pub const TOKEN_ENV: &str = "VRA_TOKEN";

fn default_true() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Appliance base URL, e.g. `https://vra.example.com`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Pre-issued bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// Verify the appliance TLS certificate
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Seconds between polls when waiting on the platform
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Page size for resource listing
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            verify_tls: true,
            poll_interval_secs: default_poll_interval_secs(),
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vra").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to the default path, returning where it was written
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().context("No config directory on this platform")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective base URL (CLI > env > config)
    pub fn effective_base_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(|s| s.to_string())
            .or_else(|| non_empty_env(URL_ENV))
            .or_else(|| self.base_url.clone())
    }

    /// Get effective token (CLI > env > config)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        cli.map(|s| s.to_string())
            .or_else(|| non_empty_env(TOKEN_ENV))
            .or_else(|| self.token.clone())
    }

    /// Poll policy seeded with the configured interval
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default().with_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
