//! Configuration loading and tiered resolution
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment tiers for the server flags are handled by the
//! binary's argument parser and arrive here as [`CliOverrides`]; settings with
//! no flag (credential, cache and timeout tuning) read their environment
//! variables in [`TomlConfig::apply_env_overrides`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "CLANWATCH_CONFIG";
/// Environment variable holding the upstream bearer credential
pub const ENV_API_KEY: &str = "CLANWATCH_API_KEY";
/// Environment variable overriding the cache TTL in seconds
pub const ENV_CACHE_TTL_SECS: &str = "CLANWATCH_CACHE_TTL_SECS";
/// Environment variable overriding the aggregation timeout in seconds
pub const ENV_AGGREGATION_TIMEOUT_SECS: &str = "CLANWATCH_AGGREGATION_TIMEOUT_SECS";

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub aggregation: AggregationConfig,
    pub scoring: ScoringConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Upstream API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Bearer credential (prefer the environment variable over the file)
    pub api_key: Option<String>,
    /// Outbound request budget
    pub requests_per_second: u32,
    /// Total per-request timeout
    pub request_timeout_secs: u64,
    /// TCP connect timeout
    pub connect_timeout_secs: u64,
    /// Page size for roster requests
    pub roster_limit: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.clashroyale.com/v1".to_string(),
            api_key: None,
            requests_per_second: 10,
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            roster_limit: 50,
        }
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a successful upstream response
    pub ttl_secs: u64,
    /// Lifetime of a remembered "no data" response
    pub negative_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            negative_ttl_secs: 10,
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Ceiling for one whole aggregation request
    pub timeout_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

/// Multipliers applied to each score component
///
/// All 1.0 reproduces the plain sum `average + trend + commitment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub reward_weight: f64,
    pub trend_weight: f64,
    pub commitment_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reward_weight: 1.0,
            trend_weight: 1.0,
            commitment_weight: 1.0,
        }
    }
}

/// HTTP query service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5740".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line (or their clap `env` fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub base_url: Option<String>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Resolve the full configuration from every tier
    ///
    /// A missing config file is not fatal: a warning is logged and defaults
    /// are used. A file that exists but cannot be parsed is an error.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let mut config = match locate_config_file(cli.config_path.as_deref()) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                load_toml_config(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                TomlConfig::default()
            }
            None => {
                warn!("No config directory available, using defaults");
                TomlConfig::default()
            }
        };

        config.apply_env_overrides()?;
        config.apply_cli_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variables for settings without a CLI flag
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            if is_valid_key(&key) {
                if self.upstream.api_key.is_some() {
                    warn!("API key found in both environment and TOML. Using environment.");
                }
                self.upstream.api_key = Some(key);
            }
        }

        if let Some(ttl) = env_u64(ENV_CACHE_TTL_SECS)? {
            self.cache.ttl_secs = ttl;
        }

        if let Some(timeout) = env_u64(ENV_AGGREGATION_TIMEOUT_SECS)? {
            self.aggregation.timeout_secs = timeout;
        }

        Ok(())
    }

    /// Apply command-line values (highest priority)
    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if let Some(bind) = &cli.bind {
            self.server.bind = bind.clone();
        }
        if let Some(base_url) = &cli.base_url {
            self.upstream.base_url = base_url.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Check invariants the rest of the workspace relies on
    pub fn validate(&self) -> Result<()> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(Error::Config("upstream.base_url must not be empty".to_string()));
        }
        if self.upstream.requests_per_second == 0 {
            return Err(Error::Config(
                "upstream.requests_per_second must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(Error::Config("cache.ttl_secs must be at least 1".to_string()));
        }
        if self.aggregation.timeout_secs == 0 {
            return Err(Error::Config(
                "aggregation.timeout_secs must be at least 1".to_string(),
            ));
        }
        let weights = [
            self.scoring.reward_weight,
            self.scoring.trend_weight,
            self.scoring.commitment_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Config(
                "scoring weights must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Upstream credential, or a configuration error explaining how to set one
    pub fn require_api_key(&self) -> Result<&str> {
        match self.upstream.api_key.as_deref() {
            Some(key) if is_valid_key(key) => Ok(key),
            _ => Err(Error::Config(format!(
                "Upstream API key not configured. Please configure using one of:\n\
                 1. Environment: {}=your-key-here\n\
                 2. TOML config: [upstream] api_key = \"your-key\"",
                ENV_API_KEY
            ))),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn negative_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.negative_ttl_secs)
    }

    pub fn aggregation_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregation.timeout_secs)
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Pick the config file path: CLI → environment → platform config dir
pub fn locate_config_file(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("clanwatch").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a whole number of seconds, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
