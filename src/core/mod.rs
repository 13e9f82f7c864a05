//! Core types and error handling for updprobe.
//!
//! - [`error`] - [`ProbeError`], [`ErrorContext`] and the operator-facing
//!   conversion [`user_friendly_error`]

pub mod error;

pub use error::{ErrorContext, ProbeError, user_friendly_error};
