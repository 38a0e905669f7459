//! Pipeline configuration.
//!
//! Resolution order: built-in defaults, then an optional JSON file, then
//! `MEDSCAN_*` environment overrides. The result is validated before use.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::terminology::{DEFAULT_MATCH_THRESHOLD, DEFAULT_RXNAV_URL};

/// Environment variable names for overrides.
pub const ENV_RXNAV_URL: &str = "MEDSCAN_RXNAV_URL";
pub const ENV_TIMEOUT_SECS: &str = "MEDSCAN_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "MEDSCAN_MAX_RETRIES";
pub const ENV_MATCH_THRESHOLD: &str = "MEDSCAN_MATCH_THRESHOLD";
pub const ENV_MAX_CONCURRENCY: &str = "MEDSCAN_MAX_CONCURRENCY";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for the normalization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizerConfig {
    /// RxNav REST base URL
    pub rxnav_base_url: String,
    /// Per-request timeout for remote lookups
    pub request_timeout_secs: u64,
    /// Extra attempts for transient remote failures (0 = single attempt)
    pub max_retries: u32,
    /// Minimum local similarity (0.0 - 1.0]
    pub match_threshold: f64,
    /// Worker threads for batch normalization
    pub max_concurrency: usize,
    /// User-Agent sent to the remote service
    pub user_agent: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            rxnav_base_url: DEFAULT_RXNAV_URL.to_string(),
            request_timeout_secs: 10,
            max_retries: 0,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            max_concurrency: 4,
            user_agent: concat!("medscan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl NormalizerConfig {
    /// Load defaults, an optional file, and environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RXNAV_URL) {
            self.rxnav_base_url = url;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_env(ENV_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            self.max_retries = parse_env(ENV_MAX_RETRIES, value)?;
        }
        if let Some(value) = lookup(ENV_MATCH_THRESHOLD) {
            self.match_threshold = parse_env(ENV_MATCH_THRESHOLD, value)?;
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = parse_env(ENV_MAX_CONCURRENCY, value)?;
        }
        Ok(self)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.rxnav_base_url.starts_with("http://") && !self.rxnav_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "rxnav_base_url",
                reason: format!("expected an http(s) URL, got {:?}", self.rxnav_base_url),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.match_threshold > 0.0 && self.match_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "match_threshold",
                reason: format!("must be in (0, 1], got {}", self.match_threshold),
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrency",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
