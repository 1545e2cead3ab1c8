//! File-based configuration
//!
//! The configuration is a JSON document; every field is optional and falls
//! back to the built-in defaults. The default location is
//! `~/.config/crmdata/config.json` on Linux.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::data::DataClientConfig;
use crate::refresh::RefreshConfig;
use crate::router::{BackendConfig, HealthCheckConfig, RouterConfig};

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The configuration parsed but cannot be used
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Cache section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_ms: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL.as_millis() as u64,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Live-update section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 30_000,
        }
    }
}

/// Router section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    pub health_check_interval_ms: u64,
    pub health_check_timeout_ms: u64,
    pub health_path: String,
    pub max_retries: u32,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            health_check_interval_ms: 30_000,
            health_check_timeout_ms: 5_000,
            health_path: "/health".to_string(),
            max_retries: 2,
        }
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backends: Vec<BackendConfig>,
    pub cache: CacheSettings,
    pub refresh: RefreshSettings,
    pub router: RouterSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            cache: CacheSettings::default(),
            refresh: RefreshSettings::default(),
            router: RouterSettings::default(),
        }
    }
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new("primary", "http://localhost:3001/api", 1),
        BackendConfig::new("fallback", "http://localhost:3002/api", 2),
    ]
}

impl AppConfig {
    /// Default config file location, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "crmdata").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads `path`, or the default location when `None`
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::Invalid("at least one backend is required".to_string()));
        }
        if let Some(backend) = self.backends.iter().find(|b| b.base_url.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "backend '{}' has an empty base_url",
                backend.name
            )));
        }
        if self.router.health_check_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "health_check_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn data_client_config(&self) -> DataClientConfig {
        DataClientConfig {
            cache_ttl: Duration::from_millis(self.cache.ttl_ms),
            max_cache_entries: self.cache.max_entries,
            refresh: RefreshConfig {
                interval: Duration::from_millis(self.refresh.interval_ms.max(1)),
                enabled: self.refresh.enabled,
            },
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            health: HealthCheckConfig {
                interval: Duration::from_millis(self.router.health_check_interval_ms.max(1)),
                timeout: Duration::from_millis(self.router.health_check_timeout_ms),
                path: self.router.health_path.clone(),
            },
            max_retries: self.router.max_retries,
        }
    }
}
