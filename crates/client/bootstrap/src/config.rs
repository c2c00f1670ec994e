//! Agent configuration: optional TOML file, then environment overrides.
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use client_transport::{DEFAULT_BASE_URL, HttpConfig};
use runtime::{DecisionConfig, RuntimeConfig};

/// Variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "AGENT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("ARTIFACTS_TOKEN is not set")]
    MissingToken,

    #[error("no characters configured (set ARTIFACTS_CHARACTERS)")]
    NoCharacters,
}

/// Everything the binary needs to start an agent.
///
/// File keys use the same names as the fields below.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub token: String,
    pub base_url: String,
    pub characters: Vec<String>,
    pub map_refresh_secs: u64,
    /// Unset loads catalogs once at start-up.
    pub catalog_refresh_secs: Option<u64>,
    pub http_max_retries: u32,
    pub max_fallback_quantity: u32,
    pub task_coin_exchange_threshold: Option<u32>,
    pub log_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            characters: Vec::new(),
            map_refresh_secs: 2,
            catalog_refresh_secs: None,
            http_max_retries: 3,
            max_fallback_quantity: DecisionConfig::default().max_fallback_quantity,
            task_coin_exchange_threshold: None,
            log_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl AgentConfig {
    /// Loads from the process environment.
    ///
    /// Environment variables:
    /// - `AGENT_CONFIG` - TOML file (default: `config.toml` in the platform config dir, if present)
    /// - `ARTIFACTS_TOKEN` - API token (required)
    /// - `ARTIFACTS_URL` - server base URL (default: `https://api.artifactsmmo.com`)
    /// - `ARTIFACTS_CHARACTERS` - comma-separated roster (required)
    /// - `MAP_REFRESH_SECS` - map refresh period (default: 2)
    /// - `CATALOG_REFRESH_SECS` - catalog refresh period (default: load once)
    /// - `HTTP_MAX_RETRIES` - retries for transient failures (default: 3)
    /// - `TASK_COIN_EXCHANGE_THRESHOLD` - coins held before exchanging (default: never)
    /// - `LOG_DIR` - also write logs to a daily file in this directory
    /// - `LOG_FILTER` - default log filter when `RUST_LOG` is unset (default: info)
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| env::var(key).ok();
        let file = lookup(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(default_config_file);
        Self::from_sources(file.as_deref(), lookup)
    }

    /// Reads `file` when given, then applies overrides from `lookup`.
    pub fn from_sources(
        file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(token) = lookup("ARTIFACTS_TOKEN") {
            self.token = token;
        }
        if let Some(url) = lookup("ARTIFACTS_URL") {
            self.base_url = url;
        }
        if let Some(roster) = lookup("ARTIFACTS_CHARACTERS") {
            self.characters = roster
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(secs) = read_var(&lookup, "MAP_REFRESH_SECS")? {
            self.map_refresh_secs = secs;
        }
        if let Some(secs) = read_var(&lookup, "CATALOG_REFRESH_SECS")? {
            self.catalog_refresh_secs = Some(secs);
        }
        if let Some(retries) = read_var(&lookup, "HTTP_MAX_RETRIES")? {
            self.http_max_retries = retries;
        }
        if let Some(threshold) = read_var(&lookup, "TASK_COIN_EXCHANGE_THRESHOLD")? {
            self.task_coin_exchange_threshold = Some(threshold);
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = lookup("LOG_FILTER") {
            self.log_filter = filter;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.characters.is_empty() {
            return Err(ConfigError::NoCharacters);
        }
        Ok(())
    }

    pub fn http_config(&self) -> HttpConfig {
        let mut http = HttpConfig::new(self.token.clone()).with_base_url(self.base_url.clone());
        http.max_retries = self.http_max_retries;
        http
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            map_refresh_interval: Duration::from_secs(self.map_refresh_secs.max(1)),
            catalog_refresh_interval: self
                .catalog_refresh_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            decision: DecisionConfig {
                max_fallback_quantity: self.max_fallback_quantity.max(1),
                task_coin_exchange_threshold: self.task_coin_exchange_threshold,
            },
            ..RuntimeConfig::default()
        }
    }
}

/// `config.toml` in the platform config directory, when it exists.
fn default_config_file() -> Option<PathBuf> {
    let path = directories::ProjectDirs::from("", "", "artifacts-agent")?
        .config_dir()
        .join("config.toml");
    path.is_file().then_some(path)
}

fn read_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
