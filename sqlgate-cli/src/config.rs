//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use sqlgate::Engine;

use crate::cli::TargetArgs;
use crate::error::{CliError, CliResult};

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "sqlgate.toml";

/// sqlgate CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Named connections
    pub connections: BTreeMap<String, NamedConnection>,
}

/// A connection stored under a name in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedConnection {
    /// Engine tag (postgres, mysql, mssql)
    pub engine: String,
    /// Connection string in URL or ADO.NET form
    pub url: String,
}

/// A fully resolved connection target
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Engine to route to
    pub engine: Engine,
    /// Raw connection string
    pub url: String,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Look up a named connection
    pub fn connection(&self, name: &str) -> CliResult<&NamedConnection> {
        self.connections
            .get(name)
            .ok_or_else(|| CliError::Config(format!("No connection named '{}'", name)))
    }
}

impl TargetArgs {
    /// Resolve the engine and connection string.
    ///
    /// Explicit `--engine` and `--url` values take precedence over the named
    /// connection they are combined with.
    pub fn resolve(&self) -> CliResult<Target> {
        let named = match self.connection {
            Some(ref name) => Some(Config::load(&self.config)?.connection(name)?.clone()),
            None => None,
        };

        let engine = self
            .engine
            .clone()
            .or_else(|| named.as_ref().map(|n| n.engine.clone()))
            .ok_or_else(|| CliError::Input("an engine is required (--engine or --connection)".into()))?;
        let url = self
            .url
            .clone()
            .or_else(|| named.map(|n| n.url))
            .ok_or_else(|| {
                CliError::Input("a connection string is required (--url or --connection)".into())
            })?;

        Ok(Target {
            engine: Engine::from_tag(&engine)?,
            url,
        })
    }
}
