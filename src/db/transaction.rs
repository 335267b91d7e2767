//! Closure-scoped transactions.
//!
//! A transaction holds one pooled connection for its whole lifetime. The
//! caller's closure receives a [`TxExecutor`] bound to that connection, so
//! every statement inside shares the same transaction and schema context.
//! Exactly one commit or one rollback happens per invocation; the connection
//! goes back to the pool after the decision on every path. If the closure
//! panics, the un-committed `sqlx::Transaction` rolls back on drop.
//!
//! Nested use: the executor only exposes statement execution, so code called
//! with the same executor runs within the outer transaction - there is no
//! way to open a second one through it (savepoints are out of scope).

use crate::db::executor::{ExecResult, QueryExecutor, QueryResult};
use crate::db::params::QueryParam;
use crate::db::pool::PoolManager;
use crate::error::{DbError, DbResult};
use crate::schema::Schema;
use futures_util::future::BoxFuture;
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, warn};

/// Statement executor bound to one open transaction.
pub struct TxExecutor {
    tx: Transaction<'static, Postgres>,
    inner: QueryExecutor,
    schema: Schema,
}

impl TxExecutor {
    /// The schema this transaction is routed to.
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Execute a row-returning statement within the transaction.
    pub async fn query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        let start = std::time::Instant::now();
        let rows = self.inner.fetch_rows(&mut *self.tx, sql, params).await?;
        let columns = rows
            .first()
            .map(crate::db::rows::column_names)
            .unwrap_or_default();
        let records = rows.iter().map(crate::db::rows::row_to_record).collect();
        Ok(QueryResult {
            columns,
            rows: records,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Execute a write or utility statement within the transaction.
    pub async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<ExecResult> {
        self.inner.write_on(&mut *self.tx, sql, params).await
    }
}

impl std::fmt::Debug for TxExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxExecutor")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Wraps a sequence of statements in a single connection and transaction
/// boundary with commit/rollback semantics.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    statement_timeout: Duration,
}

impl TransactionCoordinator {
    pub fn new(statement_timeout: Duration) -> Self {
        Self { statement_timeout }
    }

    /// Begin a transaction on one pooled connection, apply the schema
    /// context, and run `f`. Commits when `f` returns Ok; rolls back and
    /// re-raises the original error when it returns Err. A rollback failure
    /// is logged and never masks the original error.
    pub async fn run<T, F>(&self, pool: &PoolManager, schema: Schema, f: F) -> DbResult<T>
    where
        F: for<'t> FnOnce(&'t mut TxExecutor) -> BoxFuture<'t, DbResult<T>>,
    {
        let inner = QueryExecutor::new(self.statement_timeout);
        let mut tx = pool.begin().await?;

        // SET LOCAL reverts with the transaction, so the connection returns
        // to the pool without a lingering search_path. An error here drops
        // the open transaction, which rolls back.
        inner.set_local_schema_context(&mut tx, schema).await?;

        debug!(schema = %schema, "Transaction started");

        let mut executor = TxExecutor { tx, inner, schema };

        match f(&mut executor).await {
            Ok(value) => {
                executor.tx.commit().await.map_err(DbError::from)?;
                debug!(schema = %schema, "Transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = executor.tx.rollback().await {
                    warn!(
                        schema = %schema,
                        error = %rollback_err,
                        "Rollback failed after transaction error"
                    );
                }
                debug!(schema = %schema, "Transaction rolled back");
                Err(err)
            }
        }
    }
}
