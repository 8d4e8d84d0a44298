//! Server configuration.
//!
//! Environment variables:
//! - `LARDER_PORT`: Port to listen on (default: 8080)
//! - `LARDER_DATA_DIR`: Directory to store collections (default: ~/.local/share/larder-server)
//! - `LARDER_CONFIG`: Path to config file (default: ~/.config/larder-server/config.yaml)
//!
//! Config file format (every key optional):
//!
//! ```yaml
//! port: 8080
//! data_dir: /var/lib/larder
//! collections:
//!   - products
//!   - recipes
//! ```
//!
//! Priority: env vars > config file > defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_PORT: u16 = 8080;

/// Config file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    collections: Vec<String>,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Directory to store collection files
    pub data_dir: PathBuf,
    /// Path to config file
    pub config_path: PathBuf,
    /// Collections the server accepts; empty means any valid name
    pub collections: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration reading variables through `env`.
    pub fn load_with<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = env("LARDER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_config_path);

        let file = Self::read_file(&config_path)?;

        let port = match env("LARDER_PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| ConfigError::InvalidPort(p.clone()))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let data_dir = env("LARDER_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| {
                // Resolve relative paths against the config file's directory
                file.data_dir.map(|dir| match config_path.parent() {
                    Some(parent) if dir.is_relative() => parent.join(dir),
                    _ => dir,
                })
            })
            .unwrap_or_else(Self::default_data_dir);

        Ok(Self {
            port,
            data_dir,
            config_path,
            collections: file.collections,
        })
    }

    fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    /// Default data directory: ~/.local/share/larder-server on Linux
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("larder-server")
    }

    /// Default config file: ~/.config/larder-server/config.yaml on Linux
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("larder-server")
            .join("config.yaml")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    ReadError(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}
