//! Database access internals.
//!
//! - Connection pool management
//! - Query execution with schema routing
//! - Closure-scoped transactions
//! - Row-to-record conversion

pub mod executor;
pub mod params;
pub mod pool;
pub mod rows;
pub mod transaction;

pub use executor::{ExecResult, QueryExecutor, QueryResult};
pub use params::QueryParam;
pub use pool::{PoolManager, PoolStats};
pub use transaction::{TransactionCoordinator, TxExecutor};
