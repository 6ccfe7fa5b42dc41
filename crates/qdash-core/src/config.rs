//! Configuration for the dashboard data layer.
//!
//! Supports loading configuration from:
//! 1. A YAML file (explicit path, or `$XDG_CONFIG_HOME/qdash/config.yaml`)
//! 2. Environment variables (with `QDASH_` prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default IBM Quantum Cloud API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://quantum.cloud.ibm.com/api/v1";

/// Default IBM Cloud IAM token endpoint.
pub const DEFAULT_IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Cache and refresh behavior
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote service endpoints
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Credential storage
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Cache and refresh settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum age of cached data before a read triggers a refresh
    #[serde(default = "default_staleness")]
    pub staleness_seconds: u64,

    /// Period of the background refresh subscription
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,

    /// Number of jobs in a synthetic snapshot
    #[serde(default = "default_synthetic_jobs")]
    pub synthetic_jobs: usize,
}

impl CacheConfig {
    /// Staleness threshold.
    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.staleness_seconds).unwrap_or(i64::MAX))
    }

    /// Background refresh period.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            staleness_seconds: default_staleness(),
            refresh_interval_seconds: default_refresh_interval(),
            synthetic_jobs: default_synthetic_jobs(),
        }
    }
}

/// Remote endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the listing API (`{base}/backends`, `{base}/jobs`)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// IAM token exchange endpoint
    #[serde(default = "default_iam_token_url")]
    pub iam_token_url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Whole-request timeout in seconds (none by default)
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            iam_token_url: default_iam_token_url(),
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: None,
        }
    }
}

/// Credential storage settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Credential file (default `$XDG_CONFIG_HOME/qdash/credentials.json`)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Default value functions
fn default_staleness() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_synthetic_jobs() -> usize {
    crate::synthetic::DEFAULT_JOB_COUNT
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_iam_token_url() -> String {
    DEFAULT_IAM_TOKEN_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.as_ref().display())))?;

        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Default config file location, if it exists.
    pub fn default_path() -> Option<PathBuf> {
        let path = dirs::config_dir()?.join("qdash").join("config.yaml");
        path.exists().then_some(path)
    }

    /// Load configuration with the following precedence:
    /// 1. Explicit file, else the default file if present, else defaults
    /// 2. Environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) => Self::from_file(path)?,
                None => Config::default(),
            },
        };

        config = config.merge_vars(|name| std::env::var(name).ok());

        config.validate()?;
        Ok(config)
    }

    /// Apply `QDASH_*` overrides read through `lookup`.
    ///
    /// Only variables that are set override the current values; values that
    /// fail to parse are ignored.
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Cache
        if let Some(val) = lookup("QDASH_STALENESS_SECONDS").and_then(|v| v.parse().ok()) {
            self.cache.staleness_seconds = val;
        }
        if let Some(val) = lookup("QDASH_REFRESH_INTERVAL_SECONDS").and_then(|v| v.parse().ok()) {
            self.cache.refresh_interval_seconds = val;
        }
        if let Some(val) = lookup("QDASH_SYNTHETIC_JOBS").and_then(|v| v.parse().ok()) {
            self.cache.synthetic_jobs = val;
        }

        // Remote
        if let Some(v) = lookup("QDASH_API_BASE_URL") {
            self.remote.api_base_url = v;
        }
        if let Some(v) = lookup("QDASH_IAM_TOKEN_URL") {
            self.remote.iam_token_url = v;
        }

        // Credentials
        if let Some(v) = lookup("QDASH_CREDENTIALS_PATH") {
            self.credentials.path = Some(PathBuf::from(v));
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.staleness_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "cache.staleness_seconds must be greater than 0".to_string(),
            ));
        }
        if self.cache.refresh_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "cache.refresh_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.cache.synthetic_jobs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.synthetic_jobs must be greater than 0".to_string(),
            ));
        }
        if self.remote.api_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "remote.api_base_url must not be empty".to_string(),
            ));
        }
        if self.remote.iam_token_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "remote.iam_token_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
