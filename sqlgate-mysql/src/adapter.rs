//! MySQL engine adapter.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Row};
use serde_json::Value;
use sqlgate_query::result::zip_row;
use sqlgate_query::{
    Column, ConnectionConfig, Engine, EngineAdapter, GatewayError, GatewayResult, QueryResult,
};
use tracing::{debug, instrument, warn};

use crate::config::{ConnectConfig, to_opts_builder};
use crate::error::{MysqlError, MysqlResult};
use crate::types::{ColumnMeta, from_mysql_value, json_values_to_params};

/// Executes statements on a dedicated connection per call.
///
/// The connection is closed when the call finishes, whether the statement
/// succeeded or not.
#[derive(Debug, Default)]
pub struct MysqlAdapter {
    config: ConnectConfig,
}

impl MysqlAdapter {
    /// Create an adapter with the given limits.
    pub fn new(config: ConnectConfig) -> Self {
        Self { config }
    }

    async fn connect(&self, connection_string: &str) -> GatewayResult<Conn> {
        let config = ConnectionConfig::parse(connection_string)?;
        let opts = to_opts_builder(&config).await?;

        debug!(server = %config.display_target(), "Opening MySQL connection");
        let conn = with_timeout(self.config.connect_timeout, async {
            Ok(Conn::new(opts).await?)
        })
        .await
        .map_err(|e| GatewayError::connection_failed(e.to_string()))?;
        Ok(conn)
    }
}

/// Close the connection and fold a close failure into the outcome.
async fn finish<T>(conn: Conn, outcome: MysqlResult<T>, limit: Duration) -> GatewayResult<T> {
    let closed = close_within(limit, conn.disconnect()).await;
    settle(outcome, closed)
}

/// Wait at most `limit` for `close`. On expiry the close future, and the
/// connection it owns, is dropped without a clean COM_QUIT.
async fn close_within(
    limit: Duration,
    close: impl Future<Output = Result<(), mysql_async::Error>>,
) -> MysqlResult<()> {
    with_timeout(limit, async { Ok(close.await?) }).await
}

fn settle<T>(outcome: MysqlResult<T>, closed: MysqlResult<()>) -> GatewayResult<T> {
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(value), Err(e)) => {
            warn!(error = %e, "Failed to close MySQL connection");
            Ok(value)
        }
        (Err(e), Ok(())) => Err(e.into()),
        (Err(e), Err(close)) => Err(GatewayError::Aggregate(vec![e.into(), close.into()])),
    }
}

async fn run(conn: &mut Conn, sql: &str, values: &[Value]) -> MysqlResult<QueryResult> {
    let params = json_values_to_params(values);
    let mut result = conn.exec_iter(sql, params).await?;

    let metas: Vec<ColumnMeta> = result
        .columns_ref()
        .iter()
        .map(ColumnMeta::from)
        .collect();
    let rows: Vec<Row> = result.collect().await?;
    result.drop_result().await?;

    let columns: Vec<Column> = metas.iter().map(|m| Column::new(m.name.clone())).collect();
    let rows = rows
        .into_iter()
        .map(|row| {
            let values: Vec<Value> = row
                .unwrap_raw()
                .into_iter()
                .zip(&metas)
                .map(|(value, meta)| {
                    value
                        .map(|v| from_mysql_value(v, meta))
                        .unwrap_or(Value::Null)
                })
                .collect();
            zip_row(&columns, values)
        })
        .collect();

    Ok(QueryResult::new(columns, rows))
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = MysqlResult<T>>,
) -> MysqlResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| MysqlError::Timeout(limit.as_millis() as u64))?
}

#[async_trait]
impl EngineAdapter for MysqlAdapter {
    fn engine(&self) -> Engine {
        Engine::Mysql
    }

    #[instrument(skip_all, fields(engine = "mysql"))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
        values: &[Value],
    ) -> GatewayResult<Vec<QueryResult>> {
        let limit = self.config.query_timeout;
        debug!(sql = %sql, params = values.len(), "Executing query");

        let mut conn = self.connect(connection_string).await?;
        let outcome = with_timeout(limit, run(&mut conn, sql, values)).await;
        let result = finish(conn, outcome, self.config.close_timeout).await?;

        debug!(rows = result.count(), "Query complete");
        Ok(vec![result])
    }

    #[instrument(skip_all, fields(engine = "mysql"))]
    async fn test_connection(&self, connection_string: &str) -> GatewayResult<bool> {
        let limit = self.config.connect_timeout;
        let mut conn = self.connect(connection_string).await?;
        let outcome = with_timeout(limit, async {
            conn.ping().await?;
            Ok(())
        })
        .await;

        finish(conn, outcome, self.config.close_timeout)
            .await
            .inspect_err(|e| warn!(error = %e, "MySQL connectivity probe failed"))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_string() {
        let err = MysqlAdapter::default()
            .query("mysql://h:notaport/db", "SELECT 1", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedConnectionString(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_failure() {
        let adapter = MysqlAdapter::new(ConnectConfig {
            connect_timeout: Duration::from_millis(500),
            ..ConnectConfig::default()
        });
        let err = adapter
            .test_connection("mysql://root:pw@127.0.0.1:1/app")
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_engine() {
        assert_eq!(MysqlAdapter::default().engine(), Engine::Mysql);
    }

    fn missing_table() -> MysqlError {
        MysqlError::Mysql(mysql_async::Error::Server(mysql_async::ServerError {
            code: 1146,
            message: "Table 'app.missing' doesn't exist".to_string(),
            state: "42S02".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_stalled_close_is_bounded() {
        let started = std::time::Instant::now();
        let closed = close_within(Duration::from_millis(20), std::future::pending()).await;

        assert!(matches!(closed, Err(MysqlError::Timeout(20))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_close_failure_after_success_keeps_result() {
        let settled = settle(Ok(7), Err(MysqlError::Timeout(20)));
        assert_eq!(settled.unwrap(), 7);
    }

    #[test]
    fn test_query_and_close_failures_aggregate() {
        let err = settle::<()>(Err(missing_table()), Err(MysqlError::Timeout(20))).unwrap_err();

        match err {
            GatewayError::Aggregate(ref causes) => {
                assert_eq!(causes.len(), 2);
                assert!(matches!(causes[0], GatewayError::QueryExecutionFailed(_)));
                assert!(matches!(causes[1], GatewayError::ConnectionFailed(_)));
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(err.first_cause(), GatewayError::QueryExecutionFailed(_)));
    }
}
