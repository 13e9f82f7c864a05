//! Optional TOML configuration file.
//!
//! Operators who test the same service repeatedly can keep its address and
//! package path in a file instead of retyping flags.
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.updprobe/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\updprobe\config.toml`
//!
//! `--config <path>` or `UPDPROBE_CONFIG` selects another file.
//!
//! # Format
//!
//! ```toml
//! url = "http://192.168.1.100:5000"
//! file = "C:/releases/update.zip"
//! max_wait = 90
//! cleanup = true
//! ```
//!
//! All keys are optional; unknown keys are rejected so that typos surface.

use crate::core::ProbeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Base URL of the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Path of the update package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Recovery budget in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait: Option<u64>,

    /// Run the package cleanup after a confirmed recovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<bool>,
}

impl ProbeConfig {
    /// Platform default location of the configuration file, if a home
    /// directory can be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()?.join("updprobe")
        } else {
            dirs::home_dir()?.join(".updprobe")
        };

        Some(config_dir.join("config.toml"))
    }

    /// Load the configuration.
    ///
    /// With an explicit path the file must exist. Without one the default
    /// location is tried and an absent file yields the default (empty)
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ConfigError`] if the file cannot be read or parsed,
    /// or if an explicitly named file does not exist.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ProbeError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ProbeError::ConfigError {
                    message: format!("config file {} does not exist", path.display()),
                });
            }
            return Self::load_from(path).await;
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path).await,
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ConfigError`] if the file cannot be read or is not
    /// valid for this schema.
    pub async fn load_from(path: &Path) -> Result<Self, ProbeError> {
        debug!("Loading configuration from {}", path.display());

        let content = fs::read_to_string(path).await.map_err(|e| ProbeError::ConfigError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;

        toml::from_str(&content).map_err(|e| ProbeError::ConfigError {
            message: format!("failed to parse {}: {e}", path.display()),
        })
    }
}
