//! `sqlgate query` command - Run a statement through the gateway.

use serde_json::Value;
use sqlgate::{Gateway, QueryResult};

use crate::cli::QueryArgs;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the query command
pub async fn run(args: QueryArgs) -> CliResult<()> {
    let target = args.target.resolve()?;
    let values = parse_values(args.values.as_deref())?;

    let gateway = Gateway::with_default_adapters();
    let outcome = gateway
        .query(target.engine, &target.url, &args.sql, &values)
        .await;
    gateway.shutdown().await;

    let results: Vec<QueryResult> = outcome?;
    output::json(&results, args.pretty)
}

/// Parse `--values` into positional bind values.
pub fn parse_values(raw: Option<&str>) -> CliResult<Vec<Value>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(raw)? {
        Value::Array(values) => Ok(values),
        other => Err(CliError::Input(format!(
            "--values must be a JSON array, got {}",
            other
        ))),
    }
}
