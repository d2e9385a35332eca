//! Connection pool construction for PostgreSQL.

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use sqlgate_query::{ConnectionConfig, GatewayResult};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::{PoolConfig, to_pg_config};
use crate::error::PgError;
use crate::tls::{PgTls, make_tls};

/// Build a pool for `config` and verify it by checking out one connection.
///
/// A pool that cannot produce a connection is closed before the error is
/// returned.
pub async fn establish(config: ConnectionConfig, pool_config: PoolConfig) -> GatewayResult<Pool> {
    let pg_config = to_pg_config(&config, &pool_config);
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let mgr = match make_tls(config.ssl.as_ref()).await? {
        PgTls::Plain => Manager::from_config(pg_config, NoTls, mgr_config),
        PgTls::Native(connector) => Manager::from_config(pg_config, connector, mgr_config),
    };

    let pool = Pool::builder(mgr)
        .max_size(pool_config.max_connections)
        .runtime(Runtime::Tokio1)
        .wait_timeout(Some(pool_config.connect_timeout))
        .create_timeout(Some(pool_config.connect_timeout))
        .recycle_timeout(Some(pool_config.idle_timeout))
        .build()
        .map_err(|e| PgError::config(format!("failed to create pool: {}", e)))?;

    debug!(target_db = %config.display_target(), "Verifying PostgreSQL pool");
    if let Err(e) = pool.get().await {
        pool.close();
        return Err(PgError::from(e).into());
    }

    info!(
        target_db = %config.display_target(),
        tls = config.ssl.as_ref().is_some_and(|p| p.is_enabled()),
        max_connections = pool_config.max_connections,
        "PostgreSQL connection pool created"
    );
    Ok(pool)
}
