//! Error types for MySQL operations.

use sqlgate_query::GatewayError;
use thiserror::Error;

/// Result type for MySQL operations.
pub type MysqlResult<T> = Result<T, MysqlError>;

/// Server error codes that indicate the connection itself failed:
/// access denied (1044, 1045), unknown database (1049), too many
/// connections (1040), host blocked (1129, 1130).
const CONNECTION_ERROR_CODES: [u16; 6] = [1040, 1044, 1045, 1049, 1129, 1130];

/// Error type for MySQL operations.
#[derive(Error, Debug)]
pub enum MysqlError {
    /// MySQL driver error.
    #[error("{0}")]
    Mysql(#[from] mysql_async::Error),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl MysqlError {
    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Mysql(mysql_async::Error::Io(_)) | Self::Mysql(mysql_async::Error::Url(_)) => true,
            Self::Mysql(mysql_async::Error::Server(e)) => CONNECTION_ERROR_CODES.contains(&e.code),
            Self::Mysql(_) => false,
        }
    }
}

impl From<MysqlError> for GatewayError {
    fn from(err: MysqlError) -> Self {
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
    use mysql_async::ServerError;

    fn server_error(code: u16, message: &str) -> MysqlError {
        MysqlError::Mysql(mysql_async::Error::Server(ServerError {
            code,
            message: message.to_string(),
            state: "HY000".to_string(),
        }))
    }

    #[test]
    fn test_timeout_is_connection_error() {
        let err: GatewayError = MysqlError::Timeout(1000).into();
        assert_eq!(
            err,
            GatewayError::ConnectionFailed("operation timed out after 1000ms".into())
        );
    }

    #[test]
    fn test_server_error_classification() {
        assert!(server_error(1045, "Access denied for user 'bob'").is_connection_error());
        assert!(!server_error(1064, "You have an error in your SQL syntax").is_connection_error());
    }

    #[test]
    fn test_into_gateway_error_keeps_native_message() {
        let err: GatewayError = server_error(1146, "Table 'app.missing' doesn't exist").into();
        match err {
            GatewayError::QueryExecutionFailed(message) => {
                assert!(message.contains("Table 'app.missing' doesn't exist"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
