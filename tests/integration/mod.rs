//! Integration test suite for updprobe
//!
//! End-to-end tests against local stand-ins for a self-update service.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **common**: wiremock helpers for the service endpoints
//! - **workflow**: the library workflow against a mocked service
//! - **restart**: a service that drops the connection when the update starts
//! - **binary**: exit codes and operator output of the `updprobe` binary
//! - **config**: configuration file handling through the binary


mod restart;
mod workflow;
