//! `sqlgate parse` command - Show how a connection string is understood.

use serde_json::{Value, json};
use sqlgate::ConnectionConfig;
use sqlgate::query::connection::Dialect;

use crate::cli::ParseArgs;
use crate::error::{CliError, CliResult};
use crate::output;

/// Placeholder printed instead of a password
const MASK: &str = "********";

/// Run the parse command
pub async fn run(args: ParseArgs) -> CliResult<()> {
    let raw = match args.connection_string {
        Some(raw) => raw,
        None => args.target.resolve()?.url,
    };

    let report = describe(&raw, args.show_password)?;
    output::json(&report, true)
}

/// Build the JSON report for a connection string.
pub fn describe(raw: &str, show_password: bool) -> CliResult<Value> {
    let mut config = ConnectionConfig::parse(raw)?;
    if !show_password && config.password.is_some() {
        config.password = Some(MASK.to_string());
    }

    let dialect = match Dialect::detect(raw) {
        Dialect::Url => "url",
        Dialect::AdoNet => "ado.net",
    };

    Ok(json!({
        "dialect": dialect,
        "config": serde_json::to_value(&config).map_err(CliError::from)?,
    }))
}
