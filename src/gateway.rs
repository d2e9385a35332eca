//! Routing of requests to engine adapters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlgate_mssql::MssqlAdapter;
use sqlgate_mysql::MysqlAdapter;
use sqlgate_postgres::PostgresAdapter;
use sqlgate_query::{Engine, EngineAdapter, GatewayError, GatewayResult, QueryResult};
use tracing::{debug, instrument};

/// A query request as received from a transport.
///
/// The engine is kept as the raw tag so that an unknown engine is reported
/// as [`GatewayError::UnsupportedEngine`] at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    /// Engine tag, e.g. `postgres`.
    pub engine: String,
    /// Connection string in URL or ADO.NET form.
    pub connection_string: String,
    /// SQL text.
    pub query: String,
    /// Positional bind values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

impl GatewayRequest {
    /// Create a request without bind values.
    pub fn new(
        engine: impl Into<String>,
        connection_string: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.into(),
            connection_string: connection_string.into(),
            query: query.into(),
            values: Vec::new(),
        }
    }

    /// Set the bind values.
    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.values = values;
        self
    }
}

/// A connectivity probe request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionRequest {
    /// Engine tag, e.g. `mysql`.
    pub engine: String,
    /// Connection string in URL or ADO.NET form.
    pub connection_string: String,
}

impl TestConnectionRequest {
    /// Create a probe request.
    pub fn new(engine: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            connection_string: connection_string.into(),
        }
    }
}

/// Dispatches requests to one adapter per engine.
///
/// The gateway owns its adapters, and through them every pool cache, so
/// separate gateways share no state.
#[derive(Clone)]
pub struct Gateway {
    postgres: Arc<dyn EngineAdapter>,
    mysql: Arc<dyn EngineAdapter>,
    mssql: Arc<dyn EngineAdapter>,
}

impl Gateway {
    /// Create a gateway from explicit adapters.
    pub fn new(
        postgres: Arc<dyn EngineAdapter>,
        mysql: Arc<dyn EngineAdapter>,
        mssql: Arc<dyn EngineAdapter>,
    ) -> Self {
        Self {
            postgres,
            mysql,
            mssql,
        }
    }

    /// Create a gateway backed by the bundled driver adapters.
    pub fn with_default_adapters() -> Self {
        Self::new(
            Arc::new(PostgresAdapter::default()),
            Arc::new(MysqlAdapter::default()),
            Arc::new(MssqlAdapter::default()),
        )
    }

    /// Replace the adapter for the engine it reports.
    pub fn with_adapter(mut self, adapter: Arc<dyn EngineAdapter>) -> Self {
        match adapter.engine() {
            Engine::Postgres => self.postgres = adapter,
            Engine::Mysql => self.mysql = adapter,
            Engine::Mssql => self.mssql = adapter,
        }
        self
    }

    /// The adapter serving an engine.
    pub fn adapter(&self, engine: Engine) -> &Arc<dyn EngineAdapter> {
        match engine {
            Engine::Postgres => &self.postgres,
            Engine::Mysql => &self.mysql,
            Engine::Mssql => &self.mssql,
        }
    }

    /// Execute a request, resolving its engine tag first.
    pub async fn execute(&self, request: &GatewayRequest) -> GatewayResult<Vec<QueryResult>> {
        let engine = Engine::from_tag(&request.engine)?;
        self.query(
            engine,
            &request.connection_string,
            &request.query,
            &request.values,
        )
        .await
    }

    /// Probe connectivity for a request, resolving its engine tag first.
    pub async fn probe(&self, request: &TestConnectionRequest) -> GatewayResult<bool> {
        let engine = Engine::from_tag(&request.engine)?;
        self.test_connection(engine, &request.connection_string).await
    }

    /// Run a statement on an engine.
    ///
    /// Aggregated failures are reduced to their first cause.
    #[instrument(skip_all, fields(engine = %engine))]
    pub async fn query(
        &self,
        engine: Engine,
        connection_string: &str,
        sql: &str,
        values: &[Value],
    ) -> GatewayResult<Vec<QueryResult>> {
        debug!(params = values.len(), "Dispatching query");
        self.adapter(engine)
            .query(connection_string, sql, values)
            .await
            .map_err(GatewayError::first_cause)
    }

    /// Probe connectivity on an engine.
    #[instrument(skip_all, fields(engine = %engine))]
    pub async fn test_connection(&self, engine: Engine, connection_string: &str) -> GatewayResult<bool> {
        debug!("Dispatching connectivity probe");
        self.adapter(engine)
            .test_connection(connection_string)
            .await
            .map_err(GatewayError::first_cause)
    }

    /// Close every cached pool of every adapter.
    pub async fn shutdown(&self) {
        for engine in Engine::ALL {
            self.adapter(engine).shutdown().await;
        }
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::with_default_adapters()
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("engines", &Engine::ALL)
            .finish()
    }
}
