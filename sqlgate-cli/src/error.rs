//! CLI error types and result alias.

use miette::Diagnostic;
use sqlgate::GatewayError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(sqlgate::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(sqlgate::config), help("named connections live under [connections.NAME] in sqlgate.toml"))]
    Config(String),

    /// Invalid command-line input
    #[error("Invalid input: {0}")]
    #[diagnostic(code(sqlgate::input))]
    Input(String),

    /// Error reported by the gateway
    #[error("{0}")]
    #[diagnostic(code(sqlgate::gateway))]
    Gateway(#[from] GatewayError),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Usage and configuration problems exit with 2, everything the
    /// database reported exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Gateway(
                GatewayError::MalformedConnectionString(_)
                | GatewayError::ConflictingSslConfig(_)
                | GatewayError::UnsupportedEngine(_),
            ) => 2,
            CliError::Gateway(_) | CliError::Io(_) => 1,
            CliError::Config(_) | CliError::Input(_) => 2,
        }
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Input(format!("Invalid JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Input("x".into()).exit_code(), 2);
        assert_eq!(CliError::Gateway(GatewayError::malformed("bad")).exit_code(), 2);
        assert_eq!(CliError::Gateway(GatewayError::unsupported_engine("db2")).exit_code(), 2);
        assert_eq!(
            CliError::Gateway(GatewayError::connection_failed("refused")).exit_code(),
            1
        );
    }
}
