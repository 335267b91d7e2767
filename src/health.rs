//! Liveness reporting for the external health-check boundary.
//!
//! The one component that never throws: its caller is an HTTP probe that
//! expects a status value it can render, not an error that could take the
//! probe endpoint down with it.

use crate::db::executor::QueryExecutor;
use crate::db::pool::{PoolManager, PoolStats};
use crate::schema::Schema;
use serde::Serialize;
use tracing::debug;

/// Status payload consumed by the HTTP health endpoint; serialized to JSON
/// as-is, with the HTTP status derived from `connected`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub connected: bool,
    pub pool: PoolStats,
}

/// Issues a trivial liveness query and summarizes pool occupancy.
#[derive(Debug, Clone)]
pub struct HealthReporter {
    executor: QueryExecutor,
}

impl HealthReporter {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Probe the database with `SELECT 1` against the system schema. Any
    /// failure - pool saturation, lost connection, closed pool - degrades to
    /// `connected: false`.
    pub async fn check(&self, pool: &PoolManager) -> HealthStatus {
        let connected = match self
            .executor
            .execute(pool, Schema::System, "SELECT 1 AS ok", &[])
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        };

        HealthStatus {
            connected,
            pool: pool.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ENV_CONNECT_TIMEOUT, ENV_DATABASE_URL};
    use std::time::Duration;

    #[tokio::test]
    async fn test_check_never_errors_when_unreachable() {
        // Port 1 is never a PostgreSQL server; the lazy pool dials on first
        // use and the probe must degrade to connected=false.
        let config = Config::from_lookup(|key| match key {
            k if k == ENV_DATABASE_URL => Some("postgres://u:p@127.0.0.1:1/nodb".to_string()),
            k if k == ENV_CONNECT_TIMEOUT => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        let pool = PoolManager::connect_lazy(&config).unwrap();

        let reporter = HealthReporter::new(QueryExecutor::new(Duration::from_secs(5)));
        let status = reporter.check(&pool).await;

        assert!(!status.connected);
        assert_eq!(status.pool.idle + status.pool.in_use, status.pool.total);
    }

    #[test]
    fn test_status_serializes_for_http_body() {
        let status = HealthStatus {
            connected: true,
            pool: PoolStats {
                total: 3,
                idle: 2,
                in_use: 1,
                waiting: 0,
            },
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["connected"], true);
        assert_eq!(json["pool"]["total"], 3);
        assert_eq!(json["pool"]["waiting"], 0);
    }
}
