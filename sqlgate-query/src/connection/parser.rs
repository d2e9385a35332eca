//! Connection string parser.
//!
//! Two dialects are accepted. A string with no `://` and at least one `;`
//! is read as ADO.NET `key=value;` pairs; everything else is read as a URL.

use percent_encoding::percent_decode_str;
use tracing::debug;
use url::Url;

use super::config::{ConnectionConfig, SslPolicy};
use super::ssl::{UrlParams, resolve_ssl};
use crate::error::{GatewayError, GatewayResult};

/// Connection-string dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `<scheme>://[user[:password]@]host[:port][/database][?params]`
    Url,
    /// `Server=...;Database=...;User Id=...`
    AdoNet,
}

impl Dialect {
    /// Pick the dialect for a raw string.
    ///
    /// A URL with a `;` but no `://` is classified as ADO.NET.
    pub fn detect(raw: &str) -> Self {
        if !raw.contains("://") && raw.contains(';') {
            Self::AdoNet
        } else {
            Self::Url
        }
    }
}

/// Parse a connection string into a [`ConnectionConfig`].
pub fn parse_connection_string(raw: &str) -> GatewayResult<ConnectionConfig> {
    let dialect = Dialect::detect(raw);
    debug!(len = raw.len(), ?dialect, "Parsing connection string");

    let config = match dialect {
        Dialect::AdoNet => parse_ado(raw)?,
        Dialect::Url => parse_url(raw)?,
    };

    debug!(
        host = ?config.host,
        port = ?config.port,
        database = ?config.database,
        ssl = config.ssl.is_some(),
        "Connection string parsed"
    );
    Ok(config)
}

fn parse_url(raw: &str) -> GatewayResult<ConnectionConfig> {
    let url = Url::parse(raw)
        .map_err(|e| GatewayError::malformed(format!("invalid connection URL: {e}")))?;

    let user = match url.username() {
        "" => None,
        name => Some(decode(name, "username")?),
    };
    let password = url
        .password()
        .filter(|p| !p.is_empty())
        .map(|p| decode(p, "password"))
        .transpose()?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string);
    let database = url
        .path()
        .strip_prefix('/')
        .filter(|db| !db.is_empty())
        .map(|db| decode(db, "database"))
        .transpose()?;

    let params = UrlParams::from_pairs(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())));
    let ssl = resolve_ssl(&params)?;

    Ok(ConnectionConfig {
        user,
        password,
        host,
        port: url.port(),
        database,
        ssl,
    })
}

fn decode(value: &str, field: &str) -> GatewayResult<String> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| GatewayError::malformed(format!("invalid {field} encoding")))
}

fn parse_ado(raw: &str) -> GatewayResult<ConnectionConfig> {
    let mut config = ConnectionConfig::default();

    for pair in raw.split(';').filter(|pair| !pair.trim().is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = value.trim();

        match key.trim().to_lowercase().as_str() {
            "server" | "host" | "data source" | "datasource" | "address" | "addr"
            | "network address" => config.host = Some(value.to_string()),
            "port" => config.port = Some(parse_port(value)?),
            "user" | "user id" | "userid" | "username" | "uid" => {
                config.user = Some(value.to_string())
            }
            "password" | "pwd" => config.password = Some(value.to_string()),
            "database" | "initial catalog" | "initialcatalog" => {
                config.database = Some(value.to_string())
            }
            "encrypt" | "ssl" => match parse_flag(value) {
                Some(true) => config.ssl = Some(SslPolicy::implicit()),
                Some(false) => config.ssl = Some(SslPolicy::Disabled),
                None => {}
            },
            "trustservercertificate" | "trust server certificate" => {
                if parse_flag(value) == Some(true) {
                    config.ssl = Some(SslPolicy::reject_unauthorized(false));
                }
            }
            _ => {}
        }
    }

    Ok(config)
}

fn parse_port(value: &str) -> GatewayResult<u16> {
    value
        .parse()
        .map_err(|_| GatewayError::malformed(format!("invalid port number '{value}'")))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
