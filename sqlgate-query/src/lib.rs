//! # sqlgate-query
//!
//! Engine-independent core of the sqlgate query gateway.
//!
//! This crate provides:
//! - Connection-string parsing for URL and ADO.NET dialects
//! - SSL policy resolution and TLS material loading
//! - A keyed pool cache that de-duplicates concurrent establishment
//! - The [`EngineAdapter`] contract and the normalized [`QueryResult`]
//! - The [`GatewayError`] taxonomy
//!
//! ## Example
//!
//! ```rust
//! use sqlgate_query::{ConnectionConfig, SslPolicy};
//!
//! let config = ConnectionConfig::parse(
//!     "Server=sql1;Database=orders;User Id=bob;Password=p@ss;TrustServerCertificate=true",
//! )
//! .unwrap();
//!
//! assert_eq!(config.host.as_deref(), Some("sql1"));
//! assert_eq!(config.ssl, Some(SslPolicy::reject_unauthorized(false)));
//! ```

pub mod adapter;
pub mod connection;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pool_cache;
pub mod result;

pub use adapter::EngineAdapter;
pub use connection::{ConnectionConfig, SslOptions, SslPolicy, TlsMaterials};
pub use engine::Engine;
pub use error::{GatewayError, GatewayResult};
pub use pool_cache::{Acquired, PoolCache};
pub use result::{Column, QueryResult, Row};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::adapter::EngineAdapter;
    pub use crate::connection::{ConnectionConfig, SslOptions, SslPolicy};
    pub use crate::engine::Engine;
    pub use crate::error::{GatewayError, GatewayResult};
    pub use crate::pool_cache::PoolCache;
    pub use crate::result::{Column, QueryResult, Row};
}
