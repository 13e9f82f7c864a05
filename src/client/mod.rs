//! HTTP client for the self-update service.
//!
//! [`SelfUpdateClient`] wraps the four endpoints the workflow drives
//! (health, upload, package-info, apply) plus the cleanup endpoint. Each call
//! carries its own fixed timeout from [`crate::constants`].
//!
//! None of the calls return `Err` for network trouble. Failures are folded
//! into the per-step result types of [`crate::models`], because every step has
//! its own policy for them: health fails closed, upload and package-info
//! report the error text, and apply reads a lost connection as the service
//! restarting.

mod service;

pub use service::{SelfUpdateClient, normalize_base_url};

use std::future::Future;

/// Uniform health-check interface.
///
/// The recovery poller only needs this one question answered, which keeps it
/// testable without a live service.
pub trait HealthCheck: Send + Sync {
    /// `true` when the service answered its health endpoint with HTTP 200.
    /// Any transport failure is reported as `false`.
    fn is_healthy(&self) -> impl Future<Output = bool> + Send;
}

impl HealthCheck for SelfUpdateClient {
    async fn is_healthy(&self) -> bool {
        self.check_health().await
    }
}
