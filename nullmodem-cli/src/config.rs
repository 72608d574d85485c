//! Configuration file support for nullmodem.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (NULLMODEM_*)
//! 3. Local config file (./nullmodem.toml)
//! 4. Global config file (~/.config/nullmodem/config.toml)

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the local configuration file.
pub const LOCAL_CONFIG_FILE: &str = "nullmodem.toml";

/// Control utility settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UtilityConfig {
    /// com0com install directory (skips the registry lookup).
    pub root: Option<PathBuf>,
    /// Time budget per `setupc` run, in seconds.
    pub timeout_secs: Option<u64>,
    /// File passed to `setupc --output`.
    pub log_file: Option<PathBuf>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Control utility configuration.
    #[serde(default)]
    pub utility: UtilityConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .map_err(|e| warn!("Failed to parse config file {}: {e}", path.display()))
                .ok(),
            Err(e) => {
                warn!("Failed to read config file {}: {e}", path.display());
                None
            },
        }
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "nullmodem").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one. Set values in `other` win.
    fn merge(&mut self, other: Self) {
        if other.utility.root.is_some() {
            self.utility.root = other.utility.root;
        }
        if other.utility.timeout_secs.is_some() {
            self.utility.timeout_secs = other.utility.timeout_secs;
        }
        if other.utility.log_file.is_some() {
            self.utility.log_file = other.utility.log_file;
        }
    }
}
