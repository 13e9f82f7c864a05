//! updprobe - smoke tests for self-updating web services
//!
//! Drives a web service that exposes a self-update HTTP API through one
//! complete update cycle and reports whether it came back:
//!
//! 1. check the service is healthy
//! 2. upload an update package (multipart `.zip`)
//! 3. query the stored package metadata
//! 4. after operator confirmation, trigger the update
//! 5. poll the health endpoint until the service recovers or the budget runs out
//!
//! A connection dropped while triggering the update is expected, because the
//! service may restart before it answers. It is reported as "assumed
//! restarting" and recovery polling decides the outcome.
//!
//! # Service API
//!
//! | Method | Path                            | Purpose                    |
//! |--------|---------------------------------|----------------------------|
//! | GET    | `/api/self-update/health`       | liveness, 200 when healthy |
//! | POST   | `/api/self-update/upload`       | multipart field `file`     |
//! | GET    | `/api/self-update/package-info` | stored package metadata    |
//! | POST   | `/api/self-update/apply`        | start the updater          |
//! | POST   | `/api/self-update/cleanup`      | remove old packages        |
//!
//! # Modules
//!
//! - [`cli`] - command-line flags and the entry point used by the binary
//! - [`client`] - HTTP client for the endpoints above
//! - [`config`] - settings resolution and the optional TOML file
//! - [`constants`] - endpoint paths, timeouts and exit codes
//! - [`core`] - error types and operator guidance
//! - [`models`] - response envelopes and per-step results
//! - [`utils`] - terminal output, spinner and file helpers
//! - [`workflow`] - the update state machine and recovery poller

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod utils;
pub mod workflow;

// test_utils is available for unit tests and, behind the feature, for the
// integration suite
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
