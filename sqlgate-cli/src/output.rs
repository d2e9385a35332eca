//! Styled terminal output utilities.
//!
//! Results go to stdout as JSON; everything meant for a person goes to
//! stderr.

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::error::CliResult;

/// Print a value as JSON on stdout
pub fn json<T: Serialize>(value: &T, pretty: bool) -> CliResult<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

/// Print a section header
pub fn section(text: &str) {
    eprintln!("{}", text.bold().white());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    eprintln!("  {}: {}", key.dimmed(), value);
}

/// Print a success message
pub fn success(text: &str) {
    eprintln!("{} {}", "✔".green().bold(), text.green());
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

/// Print dimmed text
pub fn dim(text: &str) {
    eprintln!("{}", text.dimmed());
}
