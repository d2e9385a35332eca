//! Error types for Microsoft SQL Server operations.

use sqlgate_query::GatewayError;
use thiserror::Error;

/// Result type for MSSQL operations.
pub type MssqlResult<T> = Result<T, MssqlError>;

/// Server error numbers raised while logging in: login failed (18456),
/// cannot open database (4060), password expired (18487, 18488).
const LOGIN_ERROR_CODES: [u32; 4] = [18456, 4060, 18487, 18488];

/// Errors that can occur during MSSQL operations.
#[derive(Error, Debug)]
pub enum MssqlError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(String),

    /// Tiberius/SQL Server error.
    #[error("{0}")]
    SqlServer(#[from] tiberius::error::Error),

    /// Error raised while the pool manager opened a connection.
    #[error("{0}")]
    Manager(#[from] bb8_tiberius::Error),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl MssqlError {
    /// Create a pool error.
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Pool(_) | Self::Manager(_) | Self::Timeout(_) => true,
            Self::SqlServer(e) => is_connection_level(e),
        }
    }
}

fn is_connection_level(err: &tiberius::error::Error) -> bool {
    use tiberius::error::Error;

    match err {
        Error::Io { .. } | Error::Tls(_) | Error::Routing { .. } => true,
        Error::Server(token) => LOGIN_ERROR_CODES.contains(&token.code()),
        _ => false,
    }
}

impl<E> From<bb8::RunError<E>> for MssqlError
where
    E: std::error::Error,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::User(e) => MssqlError::Pool(e.to_string()),
            bb8::RunError::TimedOut => MssqlError::pool("timed out waiting for a connection"),
        }
    }
}

impl From<MssqlError> for GatewayError {
    fn from(err: MssqlError) -> Self {
        if err.is_connection_error() {
            GatewayError::ConnectionFailed(err.to_string())
        } else {
            GatewayError::QueryExecutionFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_and_timeout_are_connection_errors() {
        assert!(MssqlError::pool("exhausted").is_connection_error());
        assert!(MssqlError::Timeout(1000).is_connection_error());
    }

    #[test]
    fn test_driver_error_classification() {
        let io = MssqlError::from(tiberius::error::Error::Io {
            kind: std::io::ErrorKind::ConnectionRefused,
            message: "connection refused".into(),
        });
        assert!(io.is_connection_error());

        let protocol = MssqlError::from(tiberius::error::Error::Protocol("bad token".into()));
        assert!(!protocol.is_connection_error());
    }

    #[test]
    fn test_run_error_timeout() {
        let err: MssqlError = bb8::RunError::<std::io::Error>::TimedOut.into();
        let gateway: GatewayError = err.into();
        assert!(gateway.is_connection_error());
    }

    #[test]
    fn test_query_error_keeps_message() {
        let err = MssqlError::from(tiberius::error::Error::Protocol("bad token".into()));
        match GatewayError::from(err) {
            GatewayError::QueryExecutionFailed(message) => assert!(message.contains("bad token")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
