//! Command-line interface for updprobe
//!
//! The tool has a single job, so there are no subcommands: every flag tunes
//! the one update run.
//!
//! # Global Options
//!
//! - `--url` / `UPDPROBE_URL`: base URL of the service
//! - `--file` / `UPDPROBE_FILE`: update package to upload
//! - `--max-wait`: recovery budget in seconds
//! - `--cleanup`: remove old packages after a confirmed recovery
//! - `--config` / `UPDPROBE_CONFIG`: alternate configuration file
//! - `--verbose` / `--quiet`: log verbosity (mutually exclusive)
//! - `--no-progress` / `UPDPROBE_NO_PROGRESS`: hide the upload spinner
//!
//! # Example
//!
//! ```bash
//! updprobe --url http://192.168.1.100:5000 --file C:/releases/update.zip
//! updprobe -v --max-wait 120 --cleanup
//! ```


use crate::config::{CliOverrides, ProbeConfig, Settings};
use crate::constants::NO_PROGRESS_ENV;
use crate::workflow::{RecoveryPolicy, StdinConfirm, Target, UpdateWorkflow};
use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::FalseyValueParser;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Runtime settings derived from the global flags rather than from the run
/// itself.
///
/// Split out of [`Cli`] so that the process environment can be prepared
/// before the async runtime starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_level: String,

    /// Hide the upload spinner.
    pub no_progress: bool,
}

impl CliConfig {
    /// Export the settings to the process environment.
    ///
    /// Sets `UPDPROBE_NO_PROGRESS=1` when progress output is disabled, which
    /// [`crate::utils::Spinner`] honours.
    ///
    /// Must be called before any other thread is spawned.
    pub fn apply_to_env(&self) {
        if self.no_progress {
            // SAFETY: called from `main` before the runtime and its worker
            // threads exist.
            unsafe {
                std::env::set_var(NO_PROGRESS_ENV, "1");
            }
        }
    }
}

/// Smoke-test a self-update web service.
#[derive(Parser, Debug)]
#[command(
    name = "updprobe",
    about = "Smoke-test a web service's self-update API",
    version,
    long_about = "Uploads an update package to a running service, asks it to apply the update, \
                  and waits for the service to come back healthy."
)]
pub struct Cli {
    /// Base URL of the service (default: http://localhost:5000).
    #[arg(long, env = "UPDPROBE_URL", value_name = "URL")]
    pub url: Option<String>,

    /// Update package to upload (default: update.zip).
    #[arg(short, long, env = "UPDPROBE_FILE", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Seconds to wait for the service to recover (default: 60).
    #[arg(long, value_name = "SECONDS")]
    pub max_wait: Option<u64>,

    /// Remove old update packages after the service recovered.
    #[arg(long)]
    pub cleanup: bool,

    /// Path to an alternate configuration file.
    #[arg(short, long, env = "UPDPROBE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging. Mutually exclusive with `--quiet`.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Hide the upload spinner (useful in CI logs).
    #[arg(long, env = "UPDPROBE_NO_PROGRESS", value_parser = FalseyValueParser::new())]
    pub no_progress: bool,
}

impl Cli {
    /// Build a [`CliConfig`] from the parsed flags.
    ///
    /// - `--verbose` maps to the `debug` filter
    /// - `--quiet` maps to `error`
    /// - otherwise `warn`, so that only the step output is visible
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
        }
    }

    /// Values of the run flags, before they are merged with the config file.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            url: self.url.clone(),
            file: self.file.clone(),
            max_wait: self.max_wait,
            cleanup: self.cleanup,
        }
    }

    /// Resolve the settings and run the update workflow once.
    ///
    /// Expects [`CliConfig::apply_to_env`] to have been called already.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`crate::core::ProbeError`] of the run, or a
    /// configuration error raised before it started.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(&config.log_level);

        let file_config = ProbeConfig::load(self.config.as_deref())
            .await
            .context("Failed to load configuration")?;
        let settings = Settings::resolve(self.overrides(), file_config);
        debug!("Resolved settings: {:?}", settings);

        let workflow = UpdateWorkflow::new(Target::new(settings.base_url, settings.package_path))?
            .with_recovery(RecoveryPolicy::with_max_wait(settings.max_wait_secs))
            .with_cleanup(settings.cleanup);

        let summary = workflow
            .run(&StdinConfirm)
            .await
            .context("Update run failed")?;
        debug!("Run finished at stage {}", summary.stage());
        Ok(())
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this more than
/// once is harmless.
pub fn init_logging(default_level: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
