//! TLS connector construction for PostgreSQL.

use native_tls::{Certificate, Identity, TlsConnector};
use postgres_native_tls::MakeTlsConnector;
use sqlgate_query::{GatewayResult, SslOptions, SslPolicy, TlsMaterials};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_postgres::tls::MakeTlsConnect;
use tracing::debug;

use crate::error::{PgError, PgResult};

/// Transport selected for a pool.
pub enum PgTls {
    /// Plain TCP.
    Plain,
    /// TLS through `native-tls`.
    Native(PgTlsConnector),
}

/// A `native-tls` connector with an optional server name override.
#[derive(Clone)]
pub struct PgTlsConnector {
    inner: MakeTlsConnector,
    servername: Option<String>,
}

impl<S> MakeTlsConnect<S> for PgTlsConnector
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = postgres_native_tls::TlsStream<S>;
    type TlsConnect = postgres_native_tls::TlsConnector;
    type Error = native_tls::Error;

    fn make_tls_connect(&mut self, domain: &str) -> Result<Self::TlsConnect, Self::Error> {
        let domain = self.servername.as_deref().unwrap_or(domain);
        <MakeTlsConnector as MakeTlsConnect<S>>::make_tls_connect(&mut self.inner, domain)
    }
}

/// Choose the transport for a resolved policy, reading any referenced
/// certificate files.
pub async fn make_tls(policy: Option<&SslPolicy>) -> GatewayResult<PgTls> {
    let Some(SslPolicy::Enabled(options)) = policy else {
        return Ok(PgTls::Plain);
    };

    let materials = TlsMaterials::load(options).await?;
    let connector = build_connector(options, &materials)?;
    Ok(PgTls::Native(PgTlsConnector {
        inner: MakeTlsConnector::new(connector),
        servername: options.servername.clone(),
    }))
}

fn build_connector(options: &SslOptions, materials: &TlsMaterials) -> PgResult<TlsConnector> {
    let verify = options.verifies_certificates();
    debug!(verify, has_ca = materials.ca.is_some(), "Building PostgreSQL TLS connector");

    let mut builder = TlsConnector::builder();
    builder
        .danger_accept_invalid_certs(!verify)
        .danger_accept_invalid_hostnames(!verify);

    if let Some(ref ca) = materials.ca {
        builder.add_root_certificate(Certificate::from_pem(ca)?);
    }

    if let Some(identity) = client_identity(options, materials)? {
        builder.identity(identity);
    }

    Ok(builder.build()?)
}

/// PEM certificate plus PKCS#8 key, or a PKCS#12 archive in `sslcert` when
/// only a passphrase accompanies it.
fn client_identity(options: &SslOptions, materials: &TlsMaterials) -> PgResult<Option<Identity>> {
    if let Some((cert, key)) = materials.identity() {
        return Ok(Some(Identity::from_pkcs8(cert, key)?));
    }

    match (&materials.cert, &options.passphrase) {
        (Some(archive), Some(passphrase)) => Ok(Some(Identity::from_pkcs12(archive, passphrase)?)),
        (Some(_), None) => Err(PgError::config("sslcert requires sslkey or sslpassword")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_without_policy() {
        assert!(matches!(make_tls(None).await.unwrap(), PgTls::Plain));
        assert!(matches!(
            make_tls(Some(&SslPolicy::Disabled)).await.unwrap(),
            PgTls::Plain
        ));
    }

    #[tokio::test]
    async fn test_native_for_enabled_policy() {
        let tls = make_tls(Some(&SslPolicy::reject_unauthorized(false))).await.unwrap();
        match tls {
            PgTls::Native(connector) => assert_eq!(connector.servername, None),
            PgTls::Plain => panic!("expected TLS"),
        }
    }

    #[tokio::test]
    async fn test_servername_carried() {
        let policy = SslPolicy::Enabled(SslOptions {
            servername: Some("db.example.com".into()),
            ..Default::default()
        });
        match make_tls(Some(&policy)).await.unwrap() {
            PgTls::Native(connector) => {
                assert_eq!(connector.servername.as_deref(), Some("db.example.com"))
            }
            PgTls::Plain => panic!("expected TLS"),
        }
    }

    #[tokio::test]
    async fn test_missing_root_cert_fails() {
        let policy = SslPolicy::Enabled(SslOptions {
            ca: Some("/nonexistent/root.crt".into()),
            ..Default::default()
        });
        let err = make_tls(Some(&policy)).await.err().unwrap();
        assert!(err.is_connection_error());
    }
}
