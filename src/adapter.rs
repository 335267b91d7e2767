//! The adapter facade.
//!
//! [`DbAdapter`] is the one type application code holds. Construction is
//! explicitly two-phase: [`DbAdapter::new`] captures the resolved
//! configuration without any I/O, and [`DbAdapter::connect`] establishes the
//! pool. The split keeps pool construction out of static initializers and
//! makes the build-phase branch visible: during build the pool is created
//! lazily and never dialed, at runtime it is dialed eagerly so a dead
//! database fails startup instead of the first request.

use crate::config::Config;
use crate::db::executor::{ExecResult, QueryExecutor, QueryResult};
use crate::db::params::QueryParam;
use crate::db::pool::{PoolManager, PoolStats};
use crate::db::transaction::{TransactionCoordinator, TxExecutor};
use crate::error::{DbError, DbResult};
use crate::health::{HealthReporter, HealthStatus};
use crate::schema::Schema;
use futures_util::future::BoxFuture;
use tracing::{debug, info};

/// Single entry point for all database access across the ten schemas.
///
/// One adapter per process. All methods take `&self` except [`connect`];
/// the adapter is cheap to share behind an `Arc`.
///
/// [`connect`]: DbAdapter::connect
#[derive(Debug)]
pub struct DbAdapter {
    config: Config,
    pool: Option<PoolManager>,
    executor: QueryExecutor,
    transactions: TransactionCoordinator,
    health: HealthReporter,
}

impl DbAdapter {
    /// Capture configuration. Performs no I/O; call [`DbAdapter::connect`]
    /// before issuing queries.
    pub fn new(config: Config) -> Self {
        let statement_timeout = config.pool.statement_timeout();
        let executor = QueryExecutor::new(statement_timeout);
        Self {
            health: HealthReporter::new(executor.clone()),
            transactions: TransactionCoordinator::new(statement_timeout),
            executor,
            pool: None,
            config,
        }
    }

    /// Resolve configuration from the environment and construct an adapter.
    pub fn from_env() -> DbResult<Self> {
        Ok(Self::new(Config::from_env()?))
    }

    /// Establish the connection pool. At runtime this dials the database and
    /// fails if it is unreachable; during build phase the pool is constructed
    /// lazily and no connection is opened. Calling connect on an already
    /// connected adapter is a no-op.
    pub async fn connect(&mut self) -> DbResult<()> {
        if self.pool.is_some() {
            debug!("Adapter already connected");
            return Ok(());
        }

        let pool = if self.config.build_phase {
            info!("Build phase detected, deferring database connection");
            PoolManager::connect_lazy(&self.config)?
        } else {
            PoolManager::connect(&self.config).await?
        };

        self.pool = Some(pool);
        Ok(())
    }

    fn pool(&self) -> DbResult<&PoolManager> {
        self.pool.as_ref().ok_or_else(|| {
            DbError::configuration("adapter not connected: call connect() first")
        })
    }

    /// The configuration this adapter was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute a row-returning statement against the given schema.
    pub async fn query(
        &self,
        schema: Schema,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        self.executor.execute(self.pool()?, schema, sql, params).await
    }

    /// Execute a write or utility statement against the given schema.
    pub async fn execute(
        &self,
        schema: Schema,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<ExecResult> {
        self.executor
            .execute_write(self.pool()?, schema, sql, params)
            .await
    }

    /// Run `f` inside a transaction routed to the given schema. Commits when
    /// `f` returns Ok, rolls back when it returns Err.
    ///
    /// ```no_run
    /// # use schemapool::{DbAdapter, DbResult, QueryParam, Schema};
    /// # async fn demo(db: &DbAdapter) -> DbResult<()> {
    /// let posted = db
    ///     .transaction(Schema::Forums, |tx| {
    ///         Box::pin(async move {
    ///             tx.execute(
    ///                 "INSERT INTO posts (thread_id, body) VALUES ($1, $2)",
    ///                 &[QueryParam::Int(7), QueryParam::String("hello".into())],
    ///             )
    ///             .await?;
    ///             tx.execute(
    ///                 "UPDATE threads SET reply_count = reply_count + 1 WHERE id = $1",
    ///                 &[QueryParam::Int(7)],
    ///             )
    ///             .await
    ///         })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transaction<T, F>(&self, schema: Schema, f: F) -> DbResult<T>
    where
        F: for<'t> FnOnce(&'t mut TxExecutor) -> BoxFuture<'t, DbResult<T>>,
    {
        self.transactions.run(self.pool()?, schema, f).await
    }

    /// Probe liveness and report pool occupancy. Never fails; a broken pool
    /// reports `connected: false`. On an adapter that was never connected the
    /// pool counters are all zero.
    pub async fn health_check(&self) -> HealthStatus {
        match self.pool() {
            Ok(pool) => self.health.check(pool).await,
            Err(_) => HealthStatus {
                connected: false,
                pool: PoolStats {
                    total: 0,
                    idle: 0,
                    in_use: 0,
                    waiting: 0,
                },
            },
        }
    }

    /// Drain the pool for shutdown. In-flight statements finish; new
    /// acquires fail with [`DbError::PoolClosed`]. Idempotent.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.drain().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ENV_BUILD_PHASE, ENV_DATABASE_URL};

    fn build_phase_config() -> Config {
        Config::from_lookup(|key| {
            (key == ENV_BUILD_PHASE).then(|| "true".to_string())
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_phase_connect_needs_no_database() {
        let mut adapter = DbAdapter::new(build_phase_config());
        adapter.connect().await.unwrap();
        let stats = adapter.pool().unwrap().stats();
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn test_query_before_connect_is_a_usage_error() {
        let adapter = DbAdapter::new(build_phase_config());
        let result = adapter.query(Schema::Wiki, "SELECT 1", &[]).await;
        assert!(matches!(result, Err(DbError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let mut adapter = DbAdapter::new(build_phase_config());
        adapter.connect().await.unwrap();
        adapter.connect().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_the_pool() {
        // Build phase plus an unreachable DSN: the lazy pool is never dialed
        // before shutdown.
        let config = Config::from_lookup(|key| match key {
            k if k == ENV_DATABASE_URL => Some("postgres://u:p@127.0.0.1:1/nodb".to_string()),
            k if k == ENV_BUILD_PHASE => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        let mut adapter = DbAdapter::new(config);
        adapter.connect().await.unwrap();
        adapter.shutdown().await;

        let result = adapter.query(Schema::Users, "SELECT 1", &[]).await;
        assert!(matches!(result, Err(DbError::PoolClosed)));
        // Health degrades instead of failing.
        let status = adapter.health_check().await;
        assert!(!status.connected);
    }

    #[tokio::test]
    async fn test_health_check_before_connect() {
        let adapter = DbAdapter::new(build_phase_config());
        let status = adapter.health_check().await;
        assert!(!status.connected);
        assert_eq!(status.pool.total, 0);
    }
}
