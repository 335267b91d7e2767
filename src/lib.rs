//! Multi-schema access layer for a single PostgreSQL database.
//!
//! Ten application domains (forums, wiki, users, and so on) live as separate
//! schemas in one physical database and share one bounded connection pool.
//! Every statement is routed to exactly one schema via `search_path`, so
//! application SQL uses unqualified table names and never names a schema
//! inline.
//!
//! The entry point is [`DbAdapter`]:
//!
//! ```no_run
//! use schemapool::{DbAdapter, QueryParam, Schema};
//!
//! # async fn run() -> schemapool::DbResult<()> {
//! let mut db = DbAdapter::from_env()?;
//! db.connect().await?;
//!
//! let recent = db
//!     .query(
//!         Schema::Forums,
//!         "SELECT id, title FROM threads ORDER BY created_at DESC LIMIT $1",
//!         &[QueryParam::Int(20)],
//!     )
//!     .await?;
//! println!("{} threads", recent.len());
//!
//! db.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod schema;

pub use adapter::DbAdapter;
pub use config::Config;
pub use db::{
    ExecResult, PoolManager, PoolStats, QueryExecutor, QueryParam, QueryResult,
    TransactionCoordinator, TxExecutor,
};
pub use error::{DbError, DbResult};
pub use health::{HealthReporter, HealthStatus};
pub use schema::Schema;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for embedding applications that have no
/// logging setup of their own. `RUST_LOG` controls the filter; pass
/// `json_logs` for machine-readable output in production.
pub fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}
