//! Error taxonomy shared by every engine adapter.
//!
//! Each driver crate has its own error enum and converts into [`GatewayError`]
//! at the adapter boundary. The variants here are what callers see.
//!
//! ```rust
//! use sqlgate_query::GatewayError;
//!
//! let err = GatewayError::connection_failed("connection refused");
//! assert!(err.is_connection_error());
//! assert_eq!(err.code(), "ConnectionFailed");
//! ```

use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the gateway.
///
/// The type is `Clone` so that a single failed pool establishment can be
/// reported to every caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The input matched neither connection-string dialect.
    #[error("malformed connection string: {0}")]
    MalformedConnectionString(String),

    /// `sslmode=disable` was combined with certificate parameters.
    #[error("conflicting ssl configuration: {0}")]
    ConflictingSslConfig(String),

    /// Connect, authentication, network or timeout failure.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The engine rejected the statement or failed while running it.
    #[error("query failed: {0}")]
    QueryExecutionFailed(String),

    /// No adapter exists for the requested engine tag.
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),

    /// Several causes reported at once. Only the first is ever surfaced
    /// through dispatch.
    #[error("{} errors occurred", .0.len())]
    Aggregate(Vec<GatewayError>),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Create a malformed connection string error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedConnectionString(message.into())
    }

    /// Create a conflicting SSL configuration error.
    pub fn conflicting_ssl(message: impl Into<String>) -> Self {
        Self::ConflictingSslConfig(message.into())
    }

    /// Create a connection failure.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query execution failure.
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryExecutionFailed(message.into())
    }

    /// Create an unsupported engine error.
    pub fn unsupported_engine(tag: impl Into<String>) -> Self {
        Self::UnsupportedEngine(tag.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Reduce an aggregate to its first underlying cause.
    ///
    /// Nested aggregates are unwrapped recursively. Any other variant is
    /// returned unchanged.
    pub fn first_cause(self) -> Self {
        match self {
            Self::Aggregate(errors) => match errors.into_iter().next() {
                Some(first) => first.first_cause(),
                None => Self::internal("empty error aggregate"),
            },
            other => other,
        }
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }

    /// Check if this error was raised while parsing the connection string.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedConnectionString(_) | Self::ConflictingSslConfig(_)
        )
    }

    /// Stable name of the variant, suitable for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedConnectionString(_) => "MalformedConnectionString",
            Self::ConflictingSslConfig(_) => "ConflictingSslConfig",
            Self::ConnectionFailed(_) => "ConnectionFailed",
            Self::QueryExecutionFailed(_) => "QueryExecutionFailed",
            Self::UnsupportedEngine(_) => "UnsupportedEngine",
            Self::Aggregate(_) => "Aggregate",
            Self::Internal(_) => "Internal",
        }
    }
}
