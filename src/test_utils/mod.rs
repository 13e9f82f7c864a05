//! Test utilities for updprobe
//!
//! Shared by the unit tests and, through the `test-utils` feature, by the
//! integration suite:
//!
//! - [`init_test_logging`] for tracing output in tests
//! - [`ScriptedConfirm`] to answer the confirmation prompt without stdin
//! - [`write_package`] for a fake update package
//! - [`unused_local_url`] for a base URL nobody listens on
//! - [`RestartingService`] for a service that drops the apply connection

mod restarting;

pub use restarting::RestartingService;

use crate::workflow::Confirm;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; with
/// neither, logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Fixed answer to the confirmation prompt.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedConfirm {
    /// Operator who agrees.
    #[must_use]
    pub fn yes() -> Self {
        Self {
            answer: true,
            asked: AtomicUsize::new(0),
        }
    }

    /// Operator who declines.
    #[must_use]
    pub fn no() -> Self {
        Self::default()
    }

    /// How often the prompt was shown.
    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Confirm for ScriptedConfirm {
    async fn confirm(&self, _prompt: &str) -> io::Result<bool> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}

/// Write a fake package of `size` bytes named `name` into `dir`.
pub async fn write_package(dir: &Path, name: &str, size: usize) -> io::Result<PathBuf> {
    let path = dir.join(name);
    // Local file header magic, so the bytes at least look like a zip
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.resize(size.max(bytes.len()), 0);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Base URL of a local port that was free a moment ago.
///
/// Connections to it are refused, which is how an unreachable service
/// looks to the client.
pub fn unused_local_url() -> io::Result<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{port}"))
}
