//! Global constants used throughout the updprobe codebase.
//!
//! This module contains endpoint paths, per-call timeouts, polling parameters
//! and exit codes. Every call to the self-update service has a fixed timeout.

use std::time::Duration;

/// Health endpoint; an HTTP 200 means the service is up.
pub const HEALTH_PATH: &str = "/api/self-update/health";

/// Multipart upload endpoint for the update package (form field `file`).
pub const UPLOAD_PATH: &str = "/api/self-update/upload";

/// Metadata for the most recently uploaded package.
pub const PACKAGE_INFO_PATH: &str = "/api/self-update/package-info";

/// Triggers the external updater. The service usually restarts right after.
pub const APPLY_PATH: &str = "/api/self-update/apply";

/// Prunes old uploaded packages on the service side.
pub const CLEANUP_PATH: &str = "/api/self-update/cleanup";

/// Name of the multipart form field carrying the package.
pub const UPLOAD_FIELD: &str = "file";

/// Timeout for a single health probe (5 seconds).
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the package upload (120 seconds).
///
/// Packages can be several hundred megabytes, so this is the longest budget.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the package metadata query (10 seconds).
pub const PACKAGE_INFO_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the apply trigger (30 seconds).
pub const APPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the optional cleanup call (10 seconds).
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Base URL used when neither flag, environment nor config file sets one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Package path used when neither flag, environment nor config file sets one.
pub const DEFAULT_PACKAGE_FILE: &str = "update.zip";

/// Default recovery budget in seconds (one probe per second).
pub const DEFAULT_MAX_WAIT_SECS: u64 = 60;

/// Fixed interval between recovery probes.
pub const RECOVERY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A heartbeat line is printed after this many recovery probes.
pub const RECOVERY_HEARTBEAT_EVERY: u64 = 10;

/// Process exit code for a completed run.
pub const EXIT_SUCCESS: i32 = 0;

/// Process exit code for any terminal failure.
pub const EXIT_FAILURE: i32 = 1;

/// Process exit code when the operator interrupts the run (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Environment variable that disables spinners.
pub const NO_PROGRESS_ENV: &str = "UPDPROBE_NO_PROGRESS";
