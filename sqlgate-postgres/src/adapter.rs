//! PostgreSQL engine adapter.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde_json::Value;
use sqlgate_query::{
    ConnectionConfig, Engine, EngineAdapter, GatewayResult, PoolCache, QueryResult,
};
use tokio_postgres::types::ToSql;
use tracing::{debug, info, instrument, warn};

use crate::config::PoolConfig;
use crate::error::{PgError, PgResult};
use crate::pool::establish;
use crate::row::{columns, row_to_json};
use crate::types::json_values_to_params;

/// Executes statements through pools cached per connection string.
///
/// Pools live until [`shutdown`](EngineAdapter::shutdown) or until a failed
/// connectivity probe evicts them.
#[derive(Debug)]
pub struct PostgresAdapter {
    pools: PoolCache<Pool>,
    config: PoolConfig,
}

impl Default for PostgresAdapter {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl PostgresAdapter {
    /// Create an adapter with the given pool limits.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pools: PoolCache::new("postgres"),
            config,
        }
    }

    /// Number of cached pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    async fn run(&self, pool: &Pool, sql: &str, values: &[Value]) -> PgResult<QueryResult> {
        let client = pool.get().await?;
        debug!(sql = %sql, params = values.len(), "Executing query");

        let stmt = client.prepare(sql).await?;
        let params = json_values_to_params(values, stmt.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let rows = client.query(&stmt, &refs).await?;
        let rows = rows.iter().map(row_to_json).collect::<PgResult<Vec<_>>>()?;
        Ok(QueryResult::new(columns(stmt.columns()), rows))
    }

    async fn probe(&self, pool: &Pool) -> PgResult<()> {
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = PgResult<T>>,
) -> PgResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| PgError::Timeout(limit.as_millis() as u64))?
}

#[async_trait]
impl EngineAdapter for PostgresAdapter {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    #[instrument(skip_all, fields(engine = "postgres"))]
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

        let result = with_timeout(self.config.query_timeout, self.run(&pool, sql, values)).await?;
        debug!(rows = result.count(), "Query complete");
        Ok(vec![result])
    }

    #[instrument(skip_all, fields(engine = "postgres"))]
    async fn test_connection(&self, connection_string: &str) -> GatewayResult<bool> {
        let config = ConnectionConfig::parse(connection_string)?;
        let pool_config = self.config.clone();
        let acquired = self
            .pools
            .acquire(connection_string, move || establish(config, pool_config))
            .await?;

        let probe = with_timeout(self.config.connect_timeout, self.probe(&acquired.handle)).await;
        if let Err(ref e) = probe {
            warn!(error = %e, "PostgreSQL connectivity probe failed");
        }

        if let Some(pool) = self.pools.settle_check(connection_string, &acquired, probe.is_ok()) {
            pool.close();
        }

        probe?;
        Ok(true)
    }

    async fn shutdown(&self) {
        let pools = self.pools.drain();
        for pool in &pools {
            pool.close();
        }
        if !pools.is_empty() {
            info!(count = pools.len(), "PostgreSQL connection pools closed");
        }
    }
}
