//! Error handling for updprobe
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`ProbeError`]) for every terminal outcome of a run
//! 2. **Operator-facing guidance** ([`ErrorContext`]) telling the operator where to
//!    look next, instead of a raw error chain
//!
//! # Error Taxonomy
//!
//! | Class       | Variants                                             | Exit |
//! |-------------|------------------------------------------------------|------|
//! | Unreachable | [`ProbeError::ServiceUnreachable`]                   | 1    |
//! | Rejected    | [`ProbeError::UploadFailed`], [`ProbeError::ApplyRejected`] | 1 |
//! | Timeout     | [`ProbeError::RecoveryTimeout`]                      | 1    |
//! | UserAborted | [`ProbeError::Declined`] (1), [`ProbeError::Cancelled`] (130) | |
//!
//! Local problems (missing package, bad URL, unreadable config) exit with 1.
//!
//! # Examples
//!
//! ```rust,no_run
//! use updprobe_cli::core::{ProbeError, user_friendly_error};
//!
//! let err = ProbeError::RecoveryTimeout { waited_secs: 60 };
//! assert_eq!(err.exit_code(), 1);
//!
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display(); // colored output on stderr
//! ```

use crate::constants::{EXIT_FAILURE, EXIT_INTERRUPTED, HEALTH_PATH};
use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Terminal outcomes of an update run.
///
/// Every variant aborts the run. Non-fatal problems (a failed package-info
/// query, a failed cleanup) are reported as warnings and never become a
/// `ProbeError`.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The update package does not exist on the local machine.
    #[error("Update package not found: {path}")]
    PackageNotFound {
        /// Path that was checked
        path: String,
    },

    /// The health endpoint could not be reached or did not answer 200.
    #[error("Service is not reachable at {url}")]
    ServiceUnreachable {
        /// Full health URL that was probed
        url: String,
    },

    /// The upload was rejected by the service or failed locally.
    #[error("Upload failed: {message}")]
    UploadFailed {
        /// Server message or local error text
        message: String,
    },

    /// The service refused to start the update.
    #[error("Update trigger failed: {message}")]
    ApplyRejected {
        /// Server message, if any
        message: String,
    },

    /// The operator did not confirm the update.
    #[error("Update cancelled by operator")]
    Declined,

    /// The service did not become healthy within the recovery budget.
    #[error("Service did not recover within {waited_secs} seconds")]
    RecoveryTimeout {
        /// Recovery budget that was exhausted
        waited_secs: u64,
    },

    /// The operator interrupted the process.
    #[error("Operation cancelled (Ctrl+C)")]
    Cancelled,

    /// The configuration file could not be loaded.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What went wrong
        message: String,
    },

    /// The base URL is not an absolute http(s) URL.
    #[error("Invalid service URL '{url}': {reason}")]
    InvalidUrl {
        /// URL as given
        url: String,
        /// Parser or scheme complaint
        reason: String,
    },

    /// Local I/O failure outside of the upload.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Process exit code for this outcome.
    ///
    /// Only an interrupt is distinguished (130); every other terminal failure,
    /// a declined confirmation included, exits with 1.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}

/// A [`ProbeError`] decorated with operator guidance.
///
/// `details` explains the situation, `suggestion` says where to look next.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ProbeError,
    /// Where to look or what to do next
    pub suggestion: Option<String>,
    /// Additional explanation
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error without any guidance attached.
    #[must_use]
    pub const fn new(error: ProbeError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion (printed in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details (printed in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error with colors to stderr.
    pub fn display(&self) {
        let marker = match self.error {
            ProbeError::Cancelled | ProbeError::Declined => "cancelled".yellow().bold(),
            _ => "error".red().bold(),
        };
        eprintln!("{}: {}", marker, self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }

    /// Exit code of the wrapped error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with operator guidance.
///
/// Errors that are not a [`ProbeError`] (for example a failure while parsing
/// command-line glue) are wrapped as [`ProbeError::ConfigError`] carrying the
/// full error chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = error
        .downcast::<ProbeError>()
        .unwrap_or_else(|other| ProbeError::ConfigError {
            message: format!("{other:#}"),
        });

    create_error_context(error)
}

fn create_error_context(error: ProbeError) -> ErrorContext {
    match error {
        ProbeError::PackageNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Pass the package with --file <path> or place update.zip in the current directory"),
        ProbeError::ServiceUnreachable { .. } => ErrorContext::new(error)
            .with_details(format!(
                "The health endpoint ({HEALTH_PATH}) must answer HTTP 200 before an update is attempted"
            ))
            .with_suggestion("Check the --url value and that the web service is running"),
        ProbeError::UploadFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the package is a valid .zip and inspect the web service logs in [web root]/logs/"),
        ProbeError::ApplyRejected { .. } => ErrorContext::new(error)
            .with_details("The service refused to start the updater; nothing was changed")
            .with_suggestion("Inspect the web service logs in [web root]/logs/ and re-run once the cause is fixed"),
        ProbeError::RecoveryTimeout { .. } => ErrorContext::new(error)
            .with_details("The update may still be in progress; recovery is unconfirmed")
            .with_suggestion("Manually check the system state and the updater log: [updater dir]/logs/updater_YYYYMMDD.txt"),
        ProbeError::Declined | ProbeError::Cancelled => ErrorContext::new(error),
        ProbeError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax and keys (url, file, max_wait, cleanup) in the config file"),
        ProbeError::InvalidUrl { .. } => ErrorContext::new(error)
            .with_suggestion("Use an absolute URL such as http://192.168.1.100:5000"),
        ProbeError::Io(_) => ErrorContext::new(error),
    }
}
