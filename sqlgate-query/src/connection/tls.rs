//! Loading of TLS certificate material referenced by an [`SslOptions`].

use tracing::debug;

use super::config::SslOptions;
use crate::error::{GatewayError, GatewayResult};

/// File contents named by an [`SslOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterials {
    /// PEM client certificate.
    pub cert: Option<Vec<u8>>,
    /// PEM client key.
    pub key: Option<Vec<u8>>,
    /// PEM root certificate.
    pub ca: Option<Vec<u8>>,
}

impl TlsMaterials {
    /// Read every file the options reference.
    ///
    /// A file that cannot be read is reported as a connection failure naming
    /// the parameter it came from.
    pub async fn load(options: &SslOptions) -> GatewayResult<Self> {
        Ok(Self {
            cert: read_optional("sslcert", options.cert.as_deref()).await?,
            key: read_optional("sslkey", options.key.as_deref()).await?,
            ca: read_optional("sslrootcert", options.ca.as_deref()).await?,
        })
    }

    /// Client certificate and key, when both are present.
    pub fn identity(&self) -> Option<(&[u8], &[u8])> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Some((cert.as_slice(), key.as_slice())),
            _ => None,
        }
    }
}

async fn read_optional(param: &str, path: Option<&str>) -> GatewayResult<Option<Vec<u8>>> {
    let Some(path) = path else {
        return Ok(None);
    };

    debug!(param, path, "Reading TLS material");
    tokio::fs::read(path)
        .await
        .map(Some)
        .map_err(|e| GatewayError::connection_failed(format!("failed to read {param} '{path}': {e}")))
}
