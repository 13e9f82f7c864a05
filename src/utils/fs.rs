//! Local package file helpers.
//!
//! Everything here runs before the first network call: the package must
//! exist, its size is shown to the operator, and its SHA-256 digest is
//! printed so it can be compared with what the service reports or logs.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::debug;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Read size while hashing a package.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Format a byte count as megabytes with two decimals, e.g. `12.34 MB`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Size of a regular file in bytes.
///
/// # Errors
///
/// Fails if the path does not exist, cannot be inspected, or is not a file.
pub async fn file_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path)
        .await
        .with_context(|| format!("Failed to inspect {}", path.display()))?;

    if !metadata.is_file() {
        anyhow::bail!("{} is not a regular file", path.display());
    }

    Ok(metadata.len())
}

/// Compute the SHA-256 digest of a file as `sha256:<hex>`.
///
/// The file is streamed in chunks, so packages of any size hash in constant
/// memory.
///
/// # Errors
///
/// Fails if the file cannot be opened or read.
pub async fn compute_sha256(path: &Path) -> Result<String> {
    debug!("Computing SHA256 checksum for: {:?}", path);

    let file = fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = BufReader::with_capacity(HASH_CHUNK_SIZE, file);
    let mut hasher = Sha256::new();
    let mut chunk = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = reader
            .read(&mut chunk)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }

    Ok(format!("sha256:{:x}", hasher.finalize()))
}
