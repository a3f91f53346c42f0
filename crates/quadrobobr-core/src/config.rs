//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL override, the last email used to sign in,
//! and the request timeout.
//!
//! Configuration is stored at `~/.config/quadrobobr-admin/config.json`.
//! Environment variables take precedence over the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "quadrobobr-admin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Production API origin used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://api.kvadrobobr.ru";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "QUADROBOBR_API_URL";

/// Environment variable selecting the session storage backend.
pub const SESSION_STORE_ENV: &str = "QUADROBOBR_SESSION_STORE";

/// HTTP request timeout in seconds when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the session pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// JSON file in the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

impl SessionBackend {
    /// Parse a backend name, case-insensitively. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "file" => Some(SessionBackend::File),
            "keyring" | "keychain" => Some(SessionBackend::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_email: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub session_backend: SessionBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the session file and logs.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Base URL for API requests: environment, then config file, then the
    /// production origin. Trailing slashes are removed.
    pub fn api_base_url(&self) -> String {
        Self::resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_url.as_deref())
    }

    fn resolve_api_url(env_value: Option<String>, configured: Option<&str>) -> String {
        let chosen = env_value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| configured.map(str::trim).filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_API_URL);
        chosen.trim_end_matches('/').to_string()
    }

    /// Session backend, honoring the environment override.
    pub fn session_backend(&self) -> SessionBackend {
        std::env::var(SESSION_STORE_ENV)
            .ok()
            .and_then(|v| SessionBackend::parse(&v))
            .unwrap_or(self.session_backend)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}
