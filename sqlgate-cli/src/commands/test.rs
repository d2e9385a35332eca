//! `sqlgate test` command - Probe connectivity.

use sqlgate::Gateway;

use crate::cli::TestArgs;
use crate::error::CliResult;
use crate::output;

/// Run the test command
pub async fn run(args: TestArgs) -> CliResult<()> {
    let target = args.target.resolve()?;

    let gateway = Gateway::with_default_adapters();
    let outcome = gateway.test_connection(target.engine, &target.url).await;
    gateway.shutdown().await;

    let reachable = outcome?;
    output::success(&format!("{} is reachable", target.engine.label()));
    output::json(&reachable, false)
}
