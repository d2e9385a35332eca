//! The capability every engine adapter implements.

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::Engine;
use crate::error::GatewayResult;
use crate::result::QueryResult;

/// Executes statements and connectivity probes against one engine.
///
/// Adapters receive the raw connection string so they can key any pooled
/// resources by it.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// The engine this adapter serves.
    fn engine(&self) -> Engine;

    /// Run `sql` with positional `values`.
    ///
    /// Always returns exactly one result set.
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
        values: &[Value],
    ) -> GatewayResult<Vec<QueryResult>>;

    /// Run a trivial probe. Resolves to `true` or the connectivity error.
    async fn test_connection(&self, connection_string: &str) -> GatewayResult<bool>;

    /// Close every pooled resource this adapter owns.
    async fn shutdown(&self) {}
}
