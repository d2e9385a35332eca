//! # sqlgate-mssql
//!
//! Microsoft SQL Server adapter for the sqlgate query gateway.
//!
//! This crate provides:
//! - Connection pools per connection string using `bb8` and `bb8-tiberius`
//! - Encryption settings derived from the connection string's SSL policy
//! - `@P1..@Pn` bind values
//! - Row normalization into JSON objects
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlgate_mssql::MssqlAdapter;
//! use sqlgate_query::EngineAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = MssqlAdapter::default();
//!     let results = adapter
//!         .query(
//!             "Server=localhost;Database=orders;User Id=sa;Password=secret;TrustServerCertificate=true",
//!             "SELECT @P1 AS n",
//!             &[10.into()],
//!         )
//!         .await?;
//!     println!("{}", serde_json::to_string(&results)?);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod pool;
pub mod row;
pub mod types;

pub use adapter::MssqlAdapter;
pub use config::PoolConfig;
pub use error::{MssqlError, MssqlResult};
