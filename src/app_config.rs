//! Application configuration module
//!
//! This module handles the application configuration including loading,
//! validating and saving configuration settings.

use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Language seeding settings
    #[serde(default)]
    pub seed: SeedConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// SQLite database settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Database file; `:memory:` for a throwaway database, unset for the
    /// per-user data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Use write-ahead logging for file databases
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// How long a writer waits on a locked database, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            enable_wal: default_true(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Which languages `seed-languages` inserts when no names are given
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SeedConfig {
    /// Explicit language names or ISO codes; empty means every ISO 639-1 language
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` crate filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load the configuration file, writing a default one if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            let file = File::open(config_path)
                .with_context(|| format!("Failed to open config file: {}", config_path.display()))?;

            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;

            return Ok(config);
        }

        warn!(
            "Config file not found at '{}', creating default config.",
            config_path.display()
        );

        let config = Config::default();
        config.save(config_path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();
        let config_json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(config_path, config_json).with_context(|| {
            format!("Failed to write config to file: {}", config_path.display())
        })
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.database.busy_timeout_ms == 0 {
            return Err(anyhow!("database.busy_timeout_ms must be greater than zero"));
        }

        if let Some(path) = &self.database.path {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("database.path must not be empty when set"));
            }
        }

        if let Some(blank) = self.seed.languages.iter().position(|l| l.trim().is_empty()) {
            return Err(anyhow!("seed.languages[{}] is blank", blank));
        }

        Ok(())
    }
}
