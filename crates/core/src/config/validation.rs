//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use crate::freshness::StalenessRule;
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

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field: field.into(), reason: reason.into() }
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - a source has an empty or duplicate key, a non-http(s) URL,
    ///   an empty selector, or a zero `max_age`
    ///
    /// Returns `ConfigError::Missing` if no sources are configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Missing {
                field: "sources".into(),
                hint: "Add [[sources]] entries to the file named by MISSAL_CONFIG_FILE".into(),
            });
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            let field = format!("sources.{}", source.key);

            if source.key.trim().is_empty() {
                return Err(ConfigError::invalid("sources.key", "must not be empty"));
            }
            if !seen.insert(source.key.as_str()) {
                return Err(ConfigError::invalid(field, "duplicate key"));
            }
            if !(source.url.starts_with("https://") || source.url.starts_with("http://")) {
                return Err(ConfigError::invalid(field, "url must be http(s)"));
            }
            if source.selector.select.trim().is_empty() {
                return Err(ConfigError::invalid(field, "selector.select must not be empty"));
            }
            if let StalenessRule::MaxAge { seconds: 0 } = source.staleness {
                return Err(ConfigError::invalid(field, "max_age seconds must be greater than 0"));
            }
            if source.profile.redact.iter().any(|r| r.pattern.is_empty()) {
                tracing::warn!(key = %source.key, "empty redaction pattern will be ignored");
            }
        }

        Ok(())
    }
}
