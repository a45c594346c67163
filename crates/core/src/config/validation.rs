//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if a partition name or the critical
    /// asset list is empty, and `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - both partition names are equal
    /// - a critical asset is not an absolute path or is listed twice
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if self.precache_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "precache_name".into(),
                hint: "Set SHELF_PRECACHE_NAME, e.g. fil25-v2".into(),
            });
        }
        if self.runtime_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "runtime_name".into(),
                hint: "Set SHELF_RUNTIME_NAME, e.g. fil25-runtime-v2".into(),
            });
        }
        if self.precache_name == self.runtime_name {
            return Err(ConfigError::Invalid {
                field: "runtime_name".into(),
                reason: "must differ from precache_name".into(),
            });
        }

        if self.critical_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "critical_assets".into(),
                hint: "List at least the root document, e.g. [\"/\"]".into(),
            });
        }
        let mut seen = HashSet::new();
        for asset in &self.critical_assets {
            if !asset.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "critical_assets".into(),
                    reason: format!("{asset} must be an absolute path"),
                });
            }
            if !seen.insert(asset.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "critical_assets".into(),
                    reason: format!("{asset} is listed more than once"),
                });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
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

        if self.origin.starts_with("http://") && !self.origin.contains("localhost") && !self.origin.contains("127.0.0.1") {
            tracing::warn!(origin = %self.origin, "Serving a non-local origin over plain http");
        }

        Ok(())
    }
}
