//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

/// Upper bound for staleness windows and the sweep interval.
const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - any staleness window or the sweep interval is 0 or above 10 years
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_version` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(_) => {
                return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL".into() });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        for (field, value) in [
            ("static_ttl_secs", self.static_ttl_secs),
            ("api_ttl_secs", self.api_ttl_secs),
            ("image_ttl_secs", self.image_ttl_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
            if value > MAX_WINDOW_SECS {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: format!("must not exceed {MAX_WINDOW_SECS}s (10 years)"),
                });
            }
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        if self.allowed_hosts.is_empty() && self.supabase_host.is_none() {
            tracing::warn!("allowed_hosts is empty; only the origin host will be cached");
        }

        Ok(())
    }
}
