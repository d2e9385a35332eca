//! sqlgate CLI - Command-line interface for the sqlgate query gateway.

use clap::Parser;

use sqlgate_cli::cli::{Cli, Command};
use sqlgate_cli::commands;
use sqlgate_cli::error::CliResult;
use sqlgate_cli::output;

#[tokio::main]
async fn main() {
    sqlgate_query::logging::init();

    if let Err(e) = run().await {
        output::error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Query(args) => commands::query::run(args).await,
        Command::Test(args) => commands::test::run(args).await,
        Command::Parse(args) => commands::parse::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
