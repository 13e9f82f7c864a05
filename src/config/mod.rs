//! Run configuration for updprobe
//!
//! A run needs four values: the service base URL, the package path, the
//! recovery budget and whether to clean up afterwards. Each is resolved in
//! this order, first hit wins:
//!
//! 1. Command-line flag (`--url`, `--file`, `--max-wait`, `--cleanup`)
//! 2. Environment variable (`UPDPROBE_URL`, `UPDPROBE_FILE`), read by clap
//! 3. Configuration file ([`ProbeConfig`])
//! 4. Built-in default ([`crate::constants`])
//!
//! Per-call timeouts are not part of the configuration.
//!
//! # Example
//!
//! ```rust
//! use updprobe_cli::config::{CliOverrides, ProbeConfig, Settings};
//!
//! let settings = Settings::resolve(
//!     CliOverrides {
//!         url: Some("http://10.0.0.5:5000/".to_string()),
//!         ..Default::default()
//!     },
//!     ProbeConfig {
//!         max_wait: Some(90),
//!         ..Default::default()
//!     },
//! );
//!
//! assert_eq!(settings.base_url, "http://10.0.0.5:5000/");
//! assert_eq!(settings.max_wait_secs, 90);
//! assert_eq!(settings.package_path.to_str(), Some("update.zip"));
//! ```

mod file;

pub use file::ProbeConfig;

use crate::constants::{DEFAULT_BASE_URL, DEFAULT_MAX_WAIT_SECS, DEFAULT_PACKAGE_FILE};
use std::path::PathBuf;

/// Values given on the command line (or via clap-managed environment variables).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--url` / `UPDPROBE_URL`
    pub url: Option<String>,
    /// `--file` / `UPDPROBE_FILE`
    pub file: Option<PathBuf>,
    /// `--max-wait`
    pub max_wait: Option<u64>,
    /// `--cleanup`; a flag can only switch the cleanup on
    pub cleanup: bool,
}

/// Fully resolved settings for one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL as configured (normalised later by the client)
    pub base_url: String,
    /// Update package to upload
    pub package_path: PathBuf,
    /// Recovery budget in seconds
    pub max_wait_secs: u64,
    /// Run the cleanup call after recovery
    pub cleanup: bool,
}

impl Settings {
    /// Merge command-line values over file values over defaults.
    #[must_use]
    pub fn resolve(cli: CliOverrides, file: ProbeConfig) -> Self {
        Self {
            base_url: cli
                .url
                .or(file.url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            package_path: cli
                .file
                .or(file.file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PACKAGE_FILE)),
            max_wait_secs: cli.max_wait.or(file.max_wait).unwrap_or(DEFAULT_MAX_WAIT_SECS),
            cleanup: cli.cleanup || file.cleanup.unwrap_or(false),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(CliOverrides::default(), ProbeConfig::default())
    }
}
