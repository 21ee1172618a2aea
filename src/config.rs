//! Configuration Management
//!
//! Handles persistent configuration storage for miqctl. Passwords are never
//! stored; they come from a flag or `MIQ_PASSWORD`.

use crate::error::MiqResult;
use crate::miq::client::MiqConfig;
use crate::miq::http::HttpSettings;
use crate::resource::tags::TagCatalog;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the API URL
pub const API_URL_ENV: &str = "MIQ_API_URL";

const DEFAULT_API_URL: &str = "https://manageiq.local/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// API root, e.g. https://manageiq.local/api
    #[serde(default)]
    pub api_url: Option<String>,
    /// API user
    #[serde(default)]
    pub username: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Accept self-signed TLS certificates
    #[serde(default)]
    pub accept_invalid_certs: Option<bool>,
    /// Allowed tag values per category
    #[serde(default)]
    pub tag_categories: Option<BTreeMap<String, Vec<String>>>,
}

/// Values given on the command line, highest precedence
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub accept_invalid_certs: Option<bool>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("miqctl").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file; missing or broken files yield defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective API URL (CLI > env > config > default)
    pub fn effective_api_url(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| std::env::var(API_URL_ENV).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Get effective username (CLI > env > config); `None` lets credentials fall back further
    pub fn effective_username(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| {
                std::env::var(crate::miq::auth::USERNAME_ENV)
                    .ok()
                    .filter(|v| !v.is_empty())
            })
            .or_else(|| self.username.clone())
    }

    pub fn tag_catalog(&self) -> TagCatalog {
        self.tag_categories
            .clone()
            .map(TagCatalog::new)
            .unwrap_or_default()
    }

    /// Build the client configuration, applying overrides
    pub fn to_miq_config(&self, overrides: &Overrides) -> MiqResult<MiqConfig> {
        let api_url = self.effective_api_url(overrides.api_url.as_deref());
        let timeout = overrides
            .timeout_secs
            .or(self.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let accept_invalid_certs = overrides
            .accept_invalid_certs
            .or(self.accept_invalid_certs)
            .unwrap_or(true);

        Ok(MiqConfig::new(&api_url)?.with_http(HttpSettings {
            timeout: Duration::from_secs(timeout.max(1)),
            accept_invalid_certs,
        }))
    }

    /// Set a single key by name, as typed on the command line
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_url" => {
                MiqConfig::new(value)?;
                self.api_url = Some(value.to_string());
            }
            "username" => self.username = Some(value.to_string()),
            "timeout_secs" => self.timeout_secs = Some(value.parse()?),
            "accept_invalid_certs" => self.accept_invalid_certs = Some(value.parse()?),
            other => anyhow::bail!(
                "unknown config key '{}' (api_url, username, timeout_secs, accept_invalid_certs)",
                other
            ),
        }
        Ok(())
    }
}
