//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;

/// sqlgate - one query interface for PostgreSQL, MySQL and SQL Server
#[derive(Parser, Debug)]
#[command(name = "sqlgate")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "sqlgate - one query interface for PostgreSQL, MySQL and SQL Server", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a SQL statement and print the normalized result as JSON
    Query(QueryArgs),

    /// Check that a database is reachable
    Test(TestArgs),

    /// Parse a connection string and print the normalized configuration
    Parse(ParseArgs),

    /// Display version information
    Version,
}

/// Where to connect: a named connection or an explicit engine and URL.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Database engine (postgres, mysql, mssql)
    #[arg(short, long, env = "SQLGATE_ENGINE")]
    pub engine: Option<String>,

    /// Connection string in URL or ADO.NET form
    #[arg(short, long, env = "SQLGATE_CONNECTION_STRING", hide_env_values = true)]
    pub url: Option<String>,

    /// Named connection from the config file
    #[arg(short, long)]
    pub connection: Option<String>,

    /// Path to the config file
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,
}

/// Arguments for the `query` command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// SQL statement to execute
    pub sql: String,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Bind values as a JSON array, e.g. '[10, "x"]'
    #[arg(long)]
    pub values: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Arguments for the `test` command
#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the `parse` command
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Connection string to parse (defaults to --url or the named connection)
    pub connection_string: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the password instead of masking it
    #[arg(long)]
    pub show_password: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_args() {
        let cli = Cli::try_parse_from([
            "sqlgate",
            "query",
            "SELECT ?",
            "--engine",
            "mysql",
            "--url",
            "mysql://h/db",
            "--values",
            "[1]",
        ])
        .unwrap();

        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.sql, "SELECT ?");
                assert_eq!(args.target.engine.as_deref(), Some("mysql"));
                assert_eq!(args.values.as_deref(), Some("[1]"));
                assert_eq!(args.target.config, PathBuf::from(CONFIG_FILE_NAME));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
