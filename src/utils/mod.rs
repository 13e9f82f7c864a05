//! Supporting utilities
//!
//! - [`fs`] - Package file inspection (size, SHA-256)
//! - [`output`] - Colored operator output helpers
//! - [`progress`] - Spinner for the long upload call

pub mod fs;
pub mod output;
pub mod progress;

pub use fs::{compute_sha256, file_size, format_size};
pub use progress::Spinner;
