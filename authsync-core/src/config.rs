//! Configuration management

use crate::async_utils::RetryConfig;
use crate::error::{AuthSyncError, AuthSyncResult};
use crate::logging::LoggingConfig;
use crate::traits::FetchPolicy;
use crate::types::{AuthSyncConfig, PersistenceConfig, StatusQueryConfig};

use std::path::Path;
use std::time::Duration;

impl Default for StatusQueryConfig {
    fn default() -> Self {
        Self {
            cache_key: "auth-status".to_string(),
            stale_time_secs: 300,
            max_retries: 2,
            retry_initial_delay_ms: 1000,
            retry_max_delay_ms: 30000,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            token_key: "auth_token".to_string(),
            user_key: "user".to_string(),
            storage_dir: None,
        }
    }
}

impl Default for AuthSyncConfig {
    fn default() -> Self {
        Self {
            status: StatusQueryConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl StatusQueryConfig {
    /// Freshness and retry policy for the status query
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            stale_time: Duration::from_secs(self.stale_time_secs),
            retry: RetryConfig::with_retries(self.max_retries)
                .with_delays(self.retry_initial_delay_ms, self.retry_max_delay_ms),
        }
    }
}

impl AuthSyncConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AuthSyncResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AuthSyncError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: AuthSyncConfig = toml::from_str(&content).map_err(|e| AuthSyncError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AuthSyncResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| AuthSyncError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| AuthSyncError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthSyncResult<()> {
        if self.status.cache_key.trim().is_empty() {
            return Err(crate::config_error!(
                "status.cache_key must not be empty",
                "config"
            ));
        }

        if self.status.retry_initial_delay_ms > self.status.retry_max_delay_ms {
            return Err(crate::config_error!(
                "status.retry_initial_delay_ms must not exceed status.retry_max_delay_ms",
                "config"
            ));
        }

        if self.persistence.token_key.is_empty() || self.persistence.user_key.is_empty() {
            return Err(crate::config_error!(
                "persistence keys must not be empty",
                "config"
            ));
        }

        if self.persistence.token_key == self.persistence.user_key {
            return Err(crate::config_error!(
                "persistence.token_key and persistence.user_key must differ",
                "config"
            ));
        }

        Ok(())
    }
}
