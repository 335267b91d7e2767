//! Query execution engine.
//!
//! One call = one borrowed connection: acquire from the pool, set the schema
//! context, bind positional parameters, execute under the statement timeout,
//! release. The pooled connection is an RAII guard, so release happens
//! exactly once on every exit path - success, statement error, or timeout.
//!
//! Statements with no parameters run over the simple query protocol; DDL and
//! other utility statements (the migration runner sends these) do not
//! support the prepared path.

use crate::db::params::{QueryParam, bind_param};
use crate::db::pool::PoolManager;
use crate::db::rows::{column_names, row_to_record};
use crate::error::{DbError, DbResult};
use crate::schema::Schema;
use serde::Serialize;
use sqlx::Executor as _;
use sqlx::postgres::PgRow;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Structured result of a row-returning statement: an ordered sequence of
/// records, each a mapping from column name to JSON value.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Result of a non-row-returning statement.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub execution_time_ms: u64,
}

/// Executes single statements against a target schema.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    statement_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(statement_timeout: Duration) -> Self {
        Self { statement_timeout }
    }

    /// Execute a row-returning statement within the given schema.
    pub async fn execute(
        &self,
        pool: &PoolManager,
        schema: Schema,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let mut conn = pool.acquire().await?;

        debug!(
            schema = %schema,
            sql = %sql,
            params = params.len(),
            "Executing query"
        );

        self.set_schema_context(&mut conn, schema).await?;
        let rows = self.fetch_rows(&mut conn, sql, params).await?;

        let columns = rows.first().map(column_names).unwrap_or_default();
        let records = rows.iter().map(row_to_record).collect();

        Ok(QueryResult {
            columns,
            rows: records,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Execute a write or utility statement within the given schema and
    /// return the number of affected rows.
    pub async fn execute_write(
        &self,
        pool: &PoolManager,
        schema: Schema,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<ExecResult> {
        let start = Instant::now();
        let mut conn = pool.acquire().await?;

        debug!(
            schema = %schema,
            sql = %sql,
            params = params.len(),
            "Executing write"
        );

        self.set_schema_context(&mut conn, schema).await?;
        let mut result = self.write_on(&mut conn, sql, params).await?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Run a write statement on an already-held connection. Shared with the
    /// transaction path, which owns its connection for multiple statements.
    pub(crate) async fn write_on(
        &self,
        conn: &mut sqlx::PgConnection,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<ExecResult> {
        let start = Instant::now();
        let result = if params.is_empty() {
            self.guarded(conn.execute(sql)).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            self.guarded(query.execute(&mut *conn)).await?
        };

        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    pub(crate) async fn fetch_rows(
        &self,
        conn: &mut sqlx::PgConnection,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<PgRow>> {
        if params.is_empty() {
            self.guarded(conn.fetch_all(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            self.guarded(query.fetch_all(&mut *conn)).await
        }
    }

    /// Route unqualified table names on this connection into the target
    /// schema. Runs over the simple protocol; SET is not preparable.
    pub(crate) async fn set_schema_context(
        &self,
        conn: &mut sqlx::PgConnection,
        schema: Schema,
    ) -> DbResult<()> {
        let stmt = schema.search_path_stmt();
        self.guarded(conn.execute(stmt.as_str())).await?;
        Ok(())
    }

    /// Transaction-scoped variant: the search_path reverts when the
    /// enclosing transaction ends.
    pub(crate) async fn set_local_schema_context(
        &self,
        conn: &mut sqlx::PgConnection,
        schema: Schema,
    ) -> DbResult<()> {
        let stmt = schema.set_local_stmt();
        self.guarded(conn.execute(stmt.as_str())).await?;
        Ok(())
    }

    /// Run a driver call under the statement timeout. Every statement sent
    /// on a held connection goes through here, the schema-context SET
    /// included; a stalled peer must surface as [`DbError::StatementTimeout`]
    /// instead of holding the connection hostage.
    async fn guarded<T>(
        &self,
        call: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> DbResult<T> {
        match timeout(self.statement_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DbError::from(e)),
            Err(_) => Err(self.timeout_error()),
        }
    }

    fn timeout_error(&self) -> DbError {
        DbError::StatementTimeout {
            elapsed_secs: self.statement_timeout.as_secs(),
        }
    }
}
