//! Connection pool for Microsoft SQL Server.

use bb8::{ManageConnection, Pool};
use bb8_tiberius::ConnectionManager;
use sqlgate_query::{ConnectionConfig, GatewayError, GatewayResult};
use tracing::info;

use crate::config::{PoolConfig, to_tiberius_config};
use crate::error::MssqlError;

/// Type alias for the BB8 pool with Tiberius.
pub type TiberiusPool = Pool<ConnectionManager>;

/// Create a pool and verify that one connection can be opened.
///
/// The verification connection is opened directly through the manager so a
/// login or network failure is reported with the server's own message.
pub async fn establish(config: ConnectionConfig, pool_config: PoolConfig) -> GatewayResult<TiberiusPool> {
    let target = config.display_target();
    let tiberius_config = to_tiberius_config(&config).await?;
    let manager = ConnectionManager::new(tiberius_config);

    let probe = tokio::time::timeout(pool_config.connect_timeout, manager.connect())
        .await
        .map_err(|_| MssqlError::Timeout(pool_config.connect_timeout.as_millis() as u64))?;
    drop(probe.map_err(MssqlError::from)?);

    let pool = Pool::builder()
        .max_size(pool_config.max_connections)
        .min_idle(Some(pool_config.min_idle))
        .idle_timeout(Some(pool_config.idle_timeout))
        .connection_timeout(pool_config.connect_timeout)
        .build(manager)
        .await
        .map_err(|e| GatewayError::connection_failed(format!("failed to create pool: {e}")))?;

    info!(
        server = %target,
        max_connections = pool_config.max_connections,
        "MSSQL connection pool created"
    );

    Ok(pool)
}
