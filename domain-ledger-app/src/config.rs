//! Application configuration loaded from TOML.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use domain_ledger_core::error::{CoreError, CoreResult};
use domain_ledger_core::services::{DEFAULT_RECONCILE_CONCURRENCY, DEFAULT_TOKEN_PREFIX};

use crate::adapters::ResolverSettings;

/// Default config filename under the platform config directory
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";

const APP_DIR: &str = "domain-ledger";
const DEFAULT_DB_FILENAME: &str = "domain-ledger.db";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub verification: VerificationConfig,
    pub reconciliation: ReconciliationConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join(DEFAULT_DB_FILENAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerificationConfig {
    pub token_prefix: String,
    /// Query this nameserver instead of the system resolver
    pub nameserver: Option<IpAddr>,
    pub timeout_secs: u64,
    pub attempts: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
            nameserver: None,
            timeout_secs: 5,
            attempts: 2,
        }
    }
}

impl VerificationConfig {
    #[must_use]
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            nameserver: self.nameserver,
            timeout: Duration::from_secs(self.timeout_secs),
            attempts: self.attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconciliationConfig {
    /// Run the scheduler in `serve`
    pub enabled: bool,
    pub interval_secs: u64,
    /// Records processed at once
    pub concurrency: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            concurrency: DEFAULT_RECONCILE_CONCURRENCY,
        }
    }
}

impl ReconciliationConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `<config dir>/domain-ledger/config.toml`, or `./config.toml` without a config dir.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir().map_or_else(
        || PathBuf::from(DEFAULT_CONFIG_FILENAME),
        |dir| dir.join(APP_DIR).join(DEFAULT_CONFIG_FILENAME),
    )
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from("."), |dir| dir.join(APP_DIR))
}

impl AppConfig {
    /// Load configuration.
    ///
    /// With `path = None` the default location is used and a missing file
    /// yields the defaults. An explicit path must exist.
    ///
    /// # Errors
    /// `ConfigError` if the file cannot be read, parsed or fails validation.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let config_path = path.map_or_else(default_config_path, Path::to_path_buf);

        if !config_path.exists() {
            if path.is_some() {
                return Err(CoreError::ConfigError(format!(
                    "Configuration file not found: {}",
                    config_path.display()
                )));
            }
            log::debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&config_path)
            .map_err(|e| CoreError::ConfigError(format!("Failed to read config: {e}")))?;
        Self::from_toml(&raw)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(raw: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| CoreError::ConfigError(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `ConfigError` naming the first invalid field.
    pub fn validate(&self) -> CoreResult<()> {
        if self.verification.token_prefix.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "verification.token_prefix must not be empty".to_string(),
            ));
        }
        if self.verification.timeout_secs == 0 {
            return Err(CoreError::ConfigError(
                "verification.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.verification.attempts == 0 {
            return Err(CoreError::ConfigError(
                "verification.attempts must be greater than 0".to_string(),
            ));
        }
        if self.reconciliation.interval_secs == 0 {
            return Err(CoreError::ConfigError(
                "reconciliation.interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.reconciliation.concurrency == 0 {
            return Err(CoreError::ConfigError(
                "reconciliation.concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
