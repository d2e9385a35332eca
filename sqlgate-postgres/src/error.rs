//! Error types for PostgreSQL operations.

use sqlgate_query::GatewayError;
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// TLS setup error.
    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Query execution error.
    #[error("query error: {0}")]
    Query(String),

    /// Row decoding error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Bind value conversion error.
    #[error("type conversion error: {0}")]
    TypeConversion(String),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Pool(_) | Self::Tls(_) | Self::Config(_) | Self::Timeout(_) => true,
            Self::Postgres(e) => match e.as_db_error() {
                // 08: connection exception, 28: invalid authorization, 3D: invalid catalog name
                Some(db) => {
                    let code = db.code().code();
                    code.starts_with("08") || code.starts_with("28") || code.starts_with("3D")
                }
                None => e.is_closed(),
            },
            _ => false,
        }
    }
}

impl From<PgError> for GatewayError {
    fn from(err: PgError) -> Self {
        let connection = err.is_connection_error();
        let message = match err {
            PgError::Postgres(ref e) => match e.as_db_error() {
                Some(db) => db.to_string(),
                None => e.to_string(),
            },
            ref other => other.to_string(),
        };

        if connection {
            GatewayError::ConnectionFailed(message)
        } else {
            GatewayError::QueryExecutionFailed(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(PgError::config("sslcert requires sslkey").is_connection_error());
        assert!(PgError::Timeout(5000).is_connection_error());
        assert!(!PgError::deserialization("bad column").is_connection_error());
    }

    #[test]
    fn test_into_gateway_error() {
        let err: GatewayError = PgError::Timeout(5000).into();
        assert_eq!(
            err,
            GatewayError::ConnectionFailed("operation timed out after 5000ms".into())
        );

        let err: GatewayError = PgError::type_conversion("cannot bind \"x\" as int4").into();
        assert!(matches!(err, GatewayError::QueryExecutionFailed(_)));

        let err: GatewayError = PgError::query("statement expects 2 parameters").into();
        assert!(matches!(err, GatewayError::QueryExecutionFailed(_)));
    }
}
