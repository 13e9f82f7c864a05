//! Operator confirmation before the update is triggered.
//!
//! Triggering an update takes the service down, so the workflow never calls
//! the apply endpoint without an explicit `y` from the operator.

use colored::Colorize;
use std::future::Future;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Source of the go/no-go decision.
pub trait Confirm: Send + Sync {
    /// Show `prompt` and return whether the operator agreed.
    fn confirm(&self, prompt: &str) -> impl Future<Output = io::Result<bool>> + Send;
}

/// Reads the answer from standard input.
///
/// End of input (a closed or empty stdin) counts as a decline.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> io::Result<bool> {
        print!("{} ", prompt.green());
        io::stdout().flush()?;

        // Use async I/O for proper integration with Tokio runtime
        let mut reader = BufReader::new(tokio::io::stdin());
        let mut response = String::new();
        let read = reader.read_line(&mut response).await?;

        if read == 0 {
            println!();
            return Ok(false);
        }

        Ok(is_affirmative(&response))
    }
}

/// Only a lone `y`, in either case and surrounded by any whitespace, agrees.
#[must_use]
pub fn is_affirmative(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("y")
}
