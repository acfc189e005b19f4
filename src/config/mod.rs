//! Configuration management.
//!
//! Configuration is read from `~/.config/gazette/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields fall back to their defaults.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of sources fetched at once.
    pub workers: usize,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum age in seconds before a non-forced sync refetches.
    pub freshness_window_secs: u64,
    /// Leading articles whose images are prefetched after a sync.
    pub preload_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries held by the in-memory image cache.
    pub memory_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            sync: SyncConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            workers: 8,
            user_agent: crate::fetcher::http_fetcher::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: 300,
            preload_limit: 10,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { memory_entries: 100 }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with
    /// comments. An existing but invalid file is an error; missing fields
    /// use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/gazette/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gazette").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Gazette configuration

[fetch]
# Per-request timeout in seconds
timeout_secs = 30

# Maximum number of sources fetched at once
workers = 8

# User-Agent header; some publishers block unknown clients
user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) gazette/0.1"

[sync]
# Minimum age in seconds before a non-forced sync refetches
freshness_window_secs = 300

# Leading articles whose images are prefetched after a sync
preload_limit = 10

[cache]
# Entries held by the in-memory image cache
memory_entries = 100
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
