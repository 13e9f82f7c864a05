//! Colored operator output.
//!
//! Progress goes to stdout, failures to stderr. Colors are dropped
//! automatically by `colored` when the output is not a terminal or
//! `NO_COLOR` is set.

use colored::Colorize;
use serde_json::Value;

/// Bold magenta banner.
pub fn header(message: &str) {
    println!("{}", message.magenta().bold());
}

/// Step marker such as `[2/4] Uploading update package...`.
pub fn step(current: u8, total: u8, message: &str) {
    println!("{}", format!("[{current}/{total}] {message}").cyan());
}

/// Informational line in cyan.
pub fn info(message: &str) {
    println!("{}", message.cyan());
}

/// `✓ message` in green.
pub fn success(message: &str) {
    println!("{}", format!("✓ {message}").green());
}

/// `⚠ message` in yellow.
pub fn warning(message: &str) {
    println!("{}", format!("⚠ {message}").yellow());
}

/// `✗ message` in red, on stderr.
pub fn failure(message: &str) {
    eprintln!("{}", format!("✗ {message}").red());
}

/// Aligned `label : value` line.
pub fn field(label: &str, value: &str) {
    println!("{label:<10}: {value}");
}

/// Pretty-printed JSON, falling back to the compact form.
pub fn json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{value}"),
    }
}
