//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the expense API location, cache behaviour, and the last
//! used user id.
//!
//! Configuration is stored at `~/.config/spendcache/config.json`.
//! `SPENDCACHE_API_URL` and `SPENDCACHE_USER` override the file;
//! `SPENDCACHE_API_TOKEN` supplies an optional bearer token.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_TTL_SECS;
use crate::service::DeletePolicy;

/// Application name used for config directory paths
const APP_NAME: &str = "spendcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "SPENDCACHE_API_URL";
pub const ENV_USER: &str = "SPENDCACHE_USER";
pub const ENV_API_TOKEN: &str = "SPENDCACHE_API_TOKEN";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub cache_ttl_secs: i64,
    pub delete_policy: DeletePolicy,
    pub last_user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_TTL_SECS,
            delete_policy: DeletePolicy::default(),
            last_user_id: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(user) = lookup(ENV_USER).filter(|v| !v.trim().is_empty()) {
            self.last_user_id = Some(user);
        }
    }

    /// Bearer token for the expense API, if one is configured.
    /// Kept out of the config file so it is never written to disk.
    pub fn api_token() -> Option<String> {
        std::env::var(ENV_API_TOKEN).ok().filter(|t| !t.trim().is_empty())
    }

    pub fn cache_ttl(&self) -> Duration {
        // A non-positive TTL would disable caching silently
        if self.cache_ttl_secs > 0 {
            Duration::seconds(self.cache_ttl_secs)
        } else {
            Duration::seconds(DEFAULT_TTL_SECS)
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
