//! config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The registry reads one TOML file. Everything has a default, so an empty
//! file (or no file at all, using [`RegistryConfig::default`]) yields a
//! working configuration pointed at a local compiler channel.
//!
//! # Example
//!
//! ```toml
//! creation_timeout_secs = 600
//! default_page_size = 20
//!
//! [compiler]
//! url = "wss://compiler.example.org/ws"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: the compiler URL must be a WebSocket
//! endpoint and the page size must be positive.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Compiler channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// WebSocket endpoint of the grammar compiler.
    pub url: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8888/ws".to_string(),
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Seconds after which a non-terminal creation status counts as stalled.
    pub creation_timeout_secs: Option<u64>,

    /// Page size used when a request does not specify one.
    pub default_page_size: Option<usize>,

    /// Compiler channel settings.
    pub compiler: CompilerConfig,
}

impl RegistryConfig {
    const DEFAULT_CREATION_TIMEOUT_SECS: u64 = 600;
    const DEFAULT_PAGE_SIZE: usize = 20;

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` / `ParseError` on I/O or TOML
    /// problems, `ConfigError::InvalidValue` if a parsed value fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RegistryConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.compiler.url)
            .map_err(|e| ConfigError::InvalidValue(format!("compiler url: {e}")))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ConfigError::InvalidValue(format!(
                "compiler url must use ws or wss, got '{}'",
                url.scheme()
            )));
        }
        if self.default_page_size == Some(0) {
            return Err(ConfigError::InvalidValue(
                "default_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The stall timeout for non-terminal creation statuses.
    pub fn creation_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            self.creation_timeout_secs
                .unwrap_or(Self::DEFAULT_CREATION_TIMEOUT_SECS) as i64,
        )
    }

    /// The effective default page size.
    pub fn page_size(&self) -> usize {
        self.default_page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE)
    }
}
