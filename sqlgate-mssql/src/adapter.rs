//! SQL Server engine adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlgate_query::{
    Column, ConnectionConfig, Engine, EngineAdapter, GatewayResult, PoolCache, QueryResult,
};
use tiberius::ToSql;
use tracing::{debug, info, instrument, warn};

use crate::config::PoolConfig;
use crate::error::{MssqlError, MssqlResult};
use crate::pool::{TiberiusPool, establish};
use crate::row::{columns, row_to_json};
use crate::types::json_values_to_params;

/// Executes statements through bb8 pools cached per connection string.
///
/// Placeholders are `@P1..@Pn`, bound in the order values are supplied.
#[derive(Debug)]
pub struct MssqlAdapter {
    pools: PoolCache<TiberiusPool>,
    config: PoolConfig,
}

impl Default for MssqlAdapter {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl MssqlAdapter {
    /// Create an adapter with the given pool limits.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pools: PoolCache::new("mssql"),
            config,
        }
    }

    /// Number of cached pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    async fn run(&self, pool: &TiberiusPool, sql: &str, values: &[Value]) -> MssqlResult<QueryResult> {
        let mut client = pool.get().await?;
        debug!(sql = %sql, params = values.len(), "Executing query");

        let params = json_values_to_params(values);
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        let mut stream = client.query(sql, &refs).await?;
        let columns: Vec<Column> = stream
            .columns()
            .await?
            .map(columns)
            .unwrap_or_default();
        let rows = stream.into_first_result().await?;

        let rows = rows
            .into_iter()
            .map(|row| row_to_json(&columns, row))
            .collect::<MssqlResult<Vec<_>>>()?;
        Ok(QueryResult::new(columns, rows))
    }

    async fn probe(&self, pool: &TiberiusPool) -> MssqlResult<()> {
        let mut client = pool.get().await?;
        client.simple_query("SELECT 1").await?.into_results().await?;
        Ok(())
    }
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = MssqlResult<T>>,
) -> MssqlResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| MssqlError::Timeout(limit.as_millis() as u64))?
}

#[async_trait]
impl EngineAdapter for MssqlAdapter {
    fn engine(&self) -> Engine {
        Engine::Mssql
    }

    #[instrument(skip_all, fields(engine = "mssql"))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
        values: &[Value],
    ) -> GatewayResult<Vec<QueryResult>> {
        let config = ConnectionConfig::parse(connection_string)?;
        let pool_config = self.config.clone();
        let pool = self
            .pools
            .get_or_create(connection_string, move || establish(config, pool_config))
            .await?;

        let result = with_timeout(self.config.request_timeout, self.run(&pool, sql, values)).await?;
        debug!(rows = result.count(), "Query complete");
        Ok(vec![result])
    }

    #[instrument(skip_all, fields(engine = "mssql"))]
    async fn test_connection(&self, connection_string: &str) -> GatewayResult<bool> {
        let config = ConnectionConfig::parse(connection_string)?;
        let pool_config = self.config.clone();
        let acquired = self
            .pools
            .acquire(connection_string, move || establish(config, pool_config))
            .await?;

        let probe = with_timeout(self.config.connect_timeout, self.probe(&acquired.handle)).await;
        if let Err(ref e) = probe {
            warn!(error = %e, "SQL Server connectivity probe failed");
        }

        // bb8 has no explicit close; the pool shuts down with its last clone.
        if self
            .pools
            .settle_check(connection_string, &acquired, probe.is_ok())
            .is_some()
        {
            debug!("Released SQL Server pool after failed connectivity check");
        }

        probe?;
        Ok(true)
    }

    async fn shutdown(&self) {
        let pools = self.pools.drain();
        if !pools.is_empty() {
            info!(count = pools.len(), "SQL Server connection pools closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlgate_query::GatewayError;

    #[tokio::test]
    async fn test_malformed_port_fails_before_pooling() {
        let adapter = MssqlAdapter::default();
        let err = adapter
            .query("Server=sql1;Port=abc;Database=orders", "SELECT 1", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::MalformedConnectionString(_)));
        assert_eq!(adapter.pool_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_probe_leaves_no_pool() {
        let adapter = MssqlAdapter::new(PoolConfig {
            connect_timeout: Duration::from_millis(500),
            ..PoolConfig::default()
        });
        let err = adapter
            .test_connection("Server=127.0.0.1;Port=1;Database=orders;User Id=sa;Password=pw;Encrypt=false")
            .await
            .unwrap_err();

        assert!(err.is_connection_error());
        assert_eq!(adapter.pool_count(), 0);
    }

    #[test]
    fn test_engine() {
        assert_eq!(MssqlAdapter::default().engine(), Engine::Mssql);
    }
}
