//! Engine configuration loaded from `engine.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading the engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A value parsed but is outside its allowed range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Smallest and largest transposition table the engine accepts, in MiB.
pub const HASH_MB_RANGE: (usize, usize) = (1, 1024);

/// Engine settings. Every field is optional in the file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Name reported in `id name`.
    #[serde(default = "default_name")]
    pub name: String,
    /// Transposition table size in MiB.
    #[serde(default = "default_hash_mb")]
    pub hash_mb: usize,
    /// Depth used by a bare `go` with no limits.
    #[serde(default = "default_depth")]
    pub default_depth: u32,
    /// Time used by a bare `go` with no limits, in milliseconds; 0 means none.
    #[serde(default = "default_movetime_ms")]
    pub default_movetime_ms: u64,
    /// Subtracted from every time budget to cover GUI and pipe latency.
    #[serde(default = "default_move_overhead_ms")]
    pub move_overhead_ms: u64,
}

fn default_name() -> String {
    "Minimax".to_string()
}

fn default_hash_mb() -> usize {
    16
}

fn default_depth() -> u32 {
    6
}

fn default_movetime_ms() -> u64 {
    1000
}

fn default_move_overhead_ms() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            hash_mb: default_hash_mb(),
            default_depth: default_depth(),
            default_movetime_ms: default_movetime_ms(),
            move_overhead_ms: default_move_overhead_ms(),
        }
    }
}

impl EngineConfig {
    /// Loads the configuration at `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// [`ConfigError::ParseError`] for invalid TOML, or
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses and validates TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = HASH_MB_RANGE;
        if !(min..=max).contains(&self.hash_mb) {
            return Err(ConfigError::Invalid(format!(
                "hash_mb must be between {} and {}, got {}",
                min, max, self.hash_mb
            )));
        }
        if self.default_depth == 0 {
            return Err(ConfigError::Invalid("default_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}
