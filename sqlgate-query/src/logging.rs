//! Logging bootstrap for sqlgate binaries and embedders.
//!
//! Library code only emits `tracing` events. This module installs a
//! subscriber driven by environment variables:
//!
//! - `SQLGATE_DEBUG=true|1|yes` - Enable debug logging
//! - `SQLGATE_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `SQLGATE_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! Output goes to stderr so stdout stays reserved for results.
//!
//! ```rust,no_run
//! use sqlgate_query::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `SQLGATE_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("SQLGATE_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Log level from `SQLGATE_LOG_LEVEL`.
///
/// Defaults to "debug" if `SQLGATE_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("SQLGATE_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Log format from `SQLGATE_LOG_FORMAT`. Defaults to "json".
pub fn get_log_format() -> &'static str {
    env::var("SQLGATE_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install the subscriber. Subsequent calls are no-ops.
///
/// Nothing is installed unless `SQLGATE_DEBUG` or `SQLGATE_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("SQLGATE_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "sqlgate={level},sqlgate_query={level},sqlgate_postgres={level},\
                 sqlgate_mysql={level},sqlgate_mssql={level},sqlgate_cli={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let layer = fmt::layer().with_writer(std::io::stderr);
            match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.json())
                    .init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.compact())
                    .init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.pretty())
                    .init(),
            }

            tracing::info!(level, format = get_log_format(), "sqlgate logging initialized");
        }
    });
}
