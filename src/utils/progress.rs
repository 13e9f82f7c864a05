//! Spinner for long-running calls
//!
//! The only long call in a run is the package upload (up to two minutes).
//! While it is in flight a spinner shows the elapsed time so the operator can
//! tell a slow upload from a hung terminal.
//!
//! # Environment Variables
//!
//! - `UPDPROBE_NO_PROGRESS`: Set to a truthy value (`1`, `true`) to disable the spinner
//!
//! The spinner is also hidden automatically when stderr is not a terminal
//! (pipes, CI logs), which keeps captured output clean.
//!
//! # Example
//!
//! ```rust
//! use updprobe_cli::utils::progress::Spinner;
//!
//! let spinner = Spinner::new("Uploading update.zip");
//! // upload().await;
//! spinner.finish_and_clear();
//! ```

use crate::constants::NO_PROGRESS_ENV;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Checks if spinners should be disabled via `UPDPROBE_NO_PROGRESS`.
///
/// Reads the value the way clap reads `--no-progress` from the environment:
/// empty, `0`, `n`, `no`, `f`, `false` and `off` leave the spinner on.
fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok_and(|value| !is_falsey(&value))
}

fn is_falsey(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    matches!(value.as_str(), "" | "0" | "n" | "no" | "f" | "false" | "off")
}

/// An animated spinner for indeterminate work.
#[derive(Clone)]
pub struct Spinner {
    inner: IndicatifBar,
}

impl Spinner {
    /// Start a spinner with the given message.
    ///
    /// Returns a hidden spinner that ignores all calls when progress output is
    /// disabled.
    pub fn new(msg: impl Into<String>) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(msg.into());
        Self { inner: bar }
    }

    /// Replace the message shown next to the spinner.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Whether the spinner draws anything.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    /// Stop the spinner and erase it so normal output follows cleanly.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg} [{elapsed}]")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
