//! PostgreSQL connection and pool configuration.

use std::time::Duration;

use sqlgate_query::{ConnectionConfig, Engine, SslPolicy};
use tokio_postgres::config::SslMode;

/// Fixed pool limits for PostgreSQL.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: usize,
    /// Maximum time to establish a connection or wait for one.
    pub connect_timeout: Duration,
    /// Maximum time to recycle an idle connection.
    pub idle_timeout: Duration,
    /// Maximum time a single statement may run.
    pub query_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(300),
        }
    }
}

/// Translate a normalized configuration into a `tokio_postgres` one.
///
/// Host and port fall back to `localhost:5432`. TLS is required whenever the
/// policy enables it and disabled otherwise.
pub fn to_pg_config(config: &ConnectionConfig, pool: &PoolConfig) -> tokio_postgres::Config {
    let mut pg = tokio_postgres::Config::new();
    pg.host(config.host_or_default());
    pg.port(config.port_or(Engine::Postgres.default_port()));
    pg.connect_timeout(pool.connect_timeout);
    pg.application_name("sqlgate");

    if let Some(ref user) = config.user {
        pg.user(user);
    }
    if let Some(ref password) = config.password {
        pg.password(password);
    }
    if let Some(ref database) = config.database {
        pg.dbname(database);
    }

    pg.ssl_mode(match config.ssl {
        Some(SslPolicy::Enabled(_)) => SslMode::Require,
        Some(SslPolicy::Disabled) | None => SslMode::Disable,
    });

    pg
}
