//! SQL Server connection configuration.

use std::time::Duration;

use sqlgate_query::{ConnectionConfig, Engine, GatewayResult, SslPolicy, TlsMaterials};
use tiberius::{AuthMethod, Config, EncryptionLevel};
use tracing::warn;

/// Fixed pool limits for SQL Server.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in each pool.
    pub max_connections: u32,
    /// Minimum number of idle connections to keep.
    pub min_idle: u32,
    /// Maximum idle time before a connection is closed.
    pub idle_timeout: Duration,
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// Maximum time a single request may run.
    pub request_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_idle: 0,
            idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Build a tiberius configuration from a normalized one.
///
/// Encryption follows the SSL policy: disabled turns it off, enabled
/// requires it and either trusts any certificate or validates against the
/// given root certificate. Without a policy the driver's negotiation
/// decides.
pub async fn to_tiberius_config(config: &ConnectionConfig) -> GatewayResult<Config> {
    let mut tib = Config::new();

    tib.host(config.host_or_default());
    tib.port(config.port_or(Engine::Mssql.default_port()));
    tib.application_name("sqlgate");

    if let Some(ref database) = config.database {
        tib.database(database);
    }

    if let Some(ref user) = config.user {
        tib.authentication(AuthMethod::sql_server(
            user,
            config.password.as_deref().unwrap_or_default(),
        ));
    }

    match config.ssl {
        None => tib.encryption(EncryptionLevel::On),
        Some(SslPolicy::Disabled) => tib.encryption(EncryptionLevel::Off),
        Some(SslPolicy::Enabled(ref options)) => {
            tib.encryption(EncryptionLevel::Required);

            // Fails early on unreadable files; tiberius reads the CA itself.
            let materials = TlsMaterials::load(options).await?;
            if materials.identity().is_some() {
                warn!("client certificates are not supported by the SQL Server adapter and are ignored");
            }
            if options.passphrase.is_some() {
                warn!("sslpassword is not supported by the SQL Server adapter and is ignored");
            }
            if options.servername.is_some() {
                warn!("sslservername is not supported by the SQL Server adapter and is ignored");
            }

            if !options.verifies_certificates() {
                tib.trust_cert();
            } else if let Some(ref ca) = options.ca {
                tib.trust_cert_ca(ca);
            }
        }
    }

    Ok(tib)
}
