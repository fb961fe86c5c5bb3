//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BEEKON_*)
//! 2. TOML config file (if BEEKON_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Hosts the worker is allowed to cache for, besides the origin itself.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "beekon.ai",
    "app.beekon.ai",
    "beekon.vercel.app",
    "fonts.googleapis.com",
    "fonts.gstatic.com",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BEEKON_*)
/// 2. TOML config file (if BEEKON_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite response cache.
    ///
    /// Set via BEEKON_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the SQLite file backing durable key-value storage.
    ///
    /// Set via BEEKON_STORAGE_PATH environment variable.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Origin the worker is registered for. Relative URLs resolve against it.
    ///
    /// Set via BEEKON_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Suffix of every cache namespace name. Bumping it purges old caches on activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    #[serde(default = "default_static_ttl_secs")]
    pub static_ttl_secs: u64,

    #[serde(default = "default_api_ttl_secs")]
    pub api_ttl_secs: u64,

    #[serde(default = "default_image_ttl_secs")]
    pub image_ttl_secs: u64,

    /// How often the API namespace is swept for stale entries.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Hostnames eligible for caching (exact or subdomain match).
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Hosted database project host, appended to the allow-list when set.
    ///
    /// Set via BEEKON_SUPABASE_HOST environment variable.
    #[serde(default)]
    pub supabase_host: Option<String>,

    /// Force development mode on or off. Detected from the origin when unset.
    #[serde(default)]
    pub development: Option<bool>,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./beekon-cache.sqlite")
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./beekon-storage.sqlite")
}

fn default_origin() -> String {
    "https://app.beekon.ai".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_static_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_api_ttl_secs() -> u64 {
    5 * 60
}

fn default_image_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60 * 60
}

fn default_allowed_hosts() -> Vec<String> {
    DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect()
}

fn default_user_agent() -> String {
    "beekon-worker/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            storage_path: default_storage_path(),
            origin: default_origin(),
            cache_version: default_cache_version(),
            static_ttl_secs: default_static_ttl_secs(),
            api_ttl_secs: default_api_ttl_secs(),
            image_ttl_secs: default_image_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            allowed_hosts: default_allowed_hosts(),
            supabase_host: None,
            development: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn static_ttl(&self) -> Duration {
        Duration::from_secs(self.static_ttl_secs)
    }

    pub fn api_ttl(&self) -> Duration {
        Duration::from_secs(self.api_ttl_secs)
    }

    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.image_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// The configured allow-list plus the database host, if any.
    pub fn effective_allowed_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.allowed_hosts.iter().map(|h| h.trim().to_lowercase()).collect();
        if let Some(host) = self.supabase_host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            hosts.push(host.to_lowercase());
        }
        hosts.retain(|h| !h.is_empty());
        hosts.dedup();
        hosts
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BEEKON_`
    /// 2. TOML file from `BEEKON_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BEEKON_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BEEKON_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
