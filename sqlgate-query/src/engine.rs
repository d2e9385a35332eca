//! Supported database engines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// A database engine the gateway can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Engine {
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    Mysql,
    /// Microsoft SQL Server
    Mssql,
}

impl Engine {
    /// Every supported engine.
    pub const ALL: [Engine; 3] = [Engine::Postgres, Engine::Mysql, Engine::Mssql];

    /// Resolve an engine tag.
    ///
    /// Accepts `postgres`, `postgresql`, `mysql`, `mssql` and the legacy
    /// `sqlserver`, case-insensitively.
    ///
    /// ```rust
    /// use sqlgate_query::Engine;
    ///
    /// assert_eq!(Engine::from_tag("postgresql").unwrap(), Engine::Postgres);
    /// assert_eq!(Engine::from_tag("SqlServer").unwrap(), Engine::Mssql);
    /// assert!(Engine::from_tag("oracle").is_err());
    /// ```
    pub fn from_tag(tag: &str) -> Result<Self, GatewayError> {
        match tag.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "mssql" | "sqlserver" => Ok(Self::Mssql),
            _ => Err(GatewayError::unsupported_engine(tag)),
        }
    }

    /// Canonical tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Mssql => "mssql",
        }
    }

    /// Human readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::Mysql => "MySQL",
            Self::Mssql => "Microsoft SQL Server",
        }
    }

    /// Default server port.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mysql => 3306,
            Self::Mssql => 1433,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Engine {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl TryFrom<String> for Engine {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_tag(&value)
    }
}

impl From<Engine> for &'static str {
    fn from(engine: Engine) -> Self {
        engine.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aliases() {
        assert_eq!(Engine::from_tag("postgres").unwrap(), Engine::Postgres);
        assert_eq!(Engine::from_tag("PostgreSQL").unwrap(), Engine::Postgres);
        assert_eq!(Engine::from_tag("mysql").unwrap(), Engine::Mysql);
        assert_eq!(Engine::from_tag("mssql").unwrap(), Engine::Mssql);
        assert_eq!(Engine::from_tag("sqlserver").unwrap(), Engine::Mssql);
    }

    #[test]
    fn test_unknown_tag() {
        let err = Engine::from_tag("sqlite").unwrap_err();
        assert_eq!(err, GatewayError::unsupported_engine("sqlite"));
    }

    #[test]
    fn test_serde_accepts_aliases() {
        let engine: Engine = serde_json::from_str("\"postgresql\"").unwrap();
        assert_eq!(engine, Engine::Postgres);
        assert_eq!(serde_json::to_string(&Engine::Mssql).unwrap(), "\"mssql\"");
        assert!(serde_json::from_str::<Engine>("\"db2\"").is_err());
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(Engine::Postgres.default_port(), 5432);
        assert_eq!(Engine::Mysql.default_port(), 3306);
        assert_eq!(Engine::Mssql.default_port(), 1433);
    }
}
