//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MISSAL_*)
//! 2. TOML config file (if MISSAL_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod sources;
mod validation;

pub use sources::{NormalizationProfile, Redaction, RewriteRule, SelectorRule, SourceSpec, default_sources};
pub use validation::ConfigError;

/// Which cache backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Sqlite,
    Json,
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MISSAL_*)
/// 2. TOML config file (if MISSAL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache backend.
    ///
    /// Set via MISSAL_STORE environment variable.
    #[serde(default = "default_store")]
    pub store: StoreBackend,

    /// Path to SQLite cache database.
    ///
    /// Set via MISSAL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the JSON cache file.
    ///
    /// Set via MISSAL_JSON_PATH environment variable.
    #[serde(default = "default_json_path")]
    pub json_path: PathBuf,

    /// User-Agent string identifying this service to the remote source.
    ///
    /// Set via MISSAL_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via MISSAL_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via MISSAL_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Configured content keys. Only settable from the TOML file.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceSpec>,
}

fn default_store() -> StoreBackend {
    StoreBackend::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./missal-cache.sqlite")
}

fn default_json_path() -> PathBuf {
    PathBuf::from("./data.json")
}

fn default_user_agent() -> String {
    concat!("missal/", env!("CARGO_PKG_VERSION"), " (content cache; +https://github.com/missal-rs/missal)").into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            db_path: default_db_path(),
            json_path: default_json_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            sources: default_sources(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Look up the source configured for `key`.
    pub fn source(&self, key: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.key == key)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MISSAL_`
    /// 2. TOML file from `MISSAL_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("MISSAL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MISSAL_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::StalenessRule;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("./missal-cache.sqlite"));
        assert_eq!(config.json_path, PathBuf::from("./data.json"));
        assert!(config.user_agent.starts_with("missal/"));
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.sources.len(), 6);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_source_lookup() {
        let config = AppConfig::default();
        let saint = config.source("saint_of_the_day").unwrap();
        assert_eq!(saint.staleness, StalenessRule::DailyRollover);
        assert!(config.source("compline").is_none());
    }

    #[test]
    fn test_toml_sources_override_defaults() {
        let toml = r##"
            store = "memory"

            [[sources]]
            key = "angelus"
            url = "https://example.com/angelus"
            staleness = { kind = "max_age", seconds = 3600 }
            selector = { within = "#main", select = ".prayer" }
            profile = { rules = [{ rule = "drop", selector = ".ad" }], redact = [{ pattern = "Example" }] }
        "##;

        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.sources.len(), 1);
        let angelus = &config.sources[0];
        assert_eq!(angelus.staleness, StalenessRule::MaxAge { seconds: 3600 });
        assert_eq!(angelus.selector.within.as_deref(), Some("#main"));
        assert_eq!(angelus.profile.rules, vec![RewriteRule::Drop { selector: ".ad".into() }]);
        assert!(config.validate().is_ok());
    }
}
