//! Error types for the schemapool access layer.
//!
//! All errors are defined with `thiserror`. The taxonomy is deliberately
//! small: callers need to distinguish a fatal misconfiguration, a saturated
//! pool, a caller-side schema typo, and a failed statement - nothing else.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// No usable DSN at runtime (and not build phase). Non-recoverable: the
    /// process must not continue serving requests without a database.
    #[error("Database configuration error: {message}")]
    Configuration { message: String },

    /// A connection could not be acquired within the configured wait window.
    /// Recoverable by the caller (retry with backoff or surface "busy").
    #[error("Connection pool exhausted: no connection available within {wait_secs}s")]
    PoolTimeout { wait_secs: u64 },

    /// The pool is draining or closed; no further acquires are accepted.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The caller passed a schema identifier outside the fixed registry.
    /// A programming error, never retried.
    #[error("Unknown schema: '{name}'")]
    UnknownSchema { name: String },

    /// The underlying statement failed. `connection_lost` marks
    /// connection-level failures (the connection is discarded, not reused);
    /// statement-level failures such as constraint violations leave the
    /// connection healthy.
    #[error("Query failed: {message}")]
    QueryFailed {
        message: String,
        /// e.g. "42P01" for undefined table
        sql_state: Option<String>,
        connection_lost: bool,
    },

    /// A statement exceeded the configured statement timeout.
    #[error("Statement timed out after {elapsed_secs}s")]
    StatementTimeout { elapsed_secs: u64 },
}

impl DbError {
    /// Create a fatal configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a query failure for a statement-level error.
    pub fn query_failed(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
            sql_state,
            connection_lost: false,
        }
    }

    /// Create a query failure for a connection-level error.
    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
            sql_state: None,
            connection_lost: true,
        }
    }

    /// Create an unknown schema error.
    pub fn unknown_schema(name: impl Into<String>) -> Self {
        Self::UnknownSchema { name: name.into() }
    }

    /// Whether the operation may be retried. Only safe to act on for
    /// idempotent statements.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PoolTimeout { .. } | Self::StatementTimeout { .. } => true,
            Self::QueryFailed {
                connection_lost, ..
            } => *connection_lost,
            _ => false,
        }
    }

    /// The SQLSTATE code of the underlying database error, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::QueryFailed { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// SQLSTATE classes that mean the connection itself is gone rather than the
/// statement having failed: class 08 (connection exception) and the 57P0x
/// shutdown/termination codes the server sends before closing the wire.
pub(crate) fn is_connection_sql_state(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}

/// Classify sqlx errors into the access-layer taxonomy.
///
/// `PoolClosed` keeps its own variant; acquire timeouts are labeled at the
/// acquire site, where the configured wait window is known. Everything that
/// happens after a connection is held becomes a `QueryFailed`, flagged
/// `connection_lost` when the wire itself broke.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => DbError::PoolClosed,
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let lost = code.as_deref().is_some_and(is_connection_sql_state);
                DbError::QueryFailed {
                    message: db_err.message().to_string(),
                    sql_state: code,
                    connection_lost: lost,
                }
            }
            sqlx::Error::Io(io_err) => DbError::connection_lost(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => {
                DbError::connection_lost(format!("TLS error: {}", tls_err))
            }
            sqlx::Error::Protocol(msg) => {
                DbError::connection_lost(format!("Protocol error: {}", msg))
            }
            sqlx::Error::WorkerCrashed => DbError::connection_lost("Database worker crashed"),
            sqlx::Error::RowNotFound => DbError::query_failed("No rows returned", None),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::query_failed(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::query_failed(
                format!("Column index {} out of bounds (len: {})", index, len),
                None,
            ),
            sqlx::Error::ColumnDecode { index, source } => DbError::query_failed(
                format!("Failed to decode column {}: {}", index, source),
                None,
            ),
            sqlx::Error::Decode(source) => {
                DbError::query_failed(format!("Decode error: {}", source), None)
            }
            other => DbError::query_failed(format!("Database error: {}", other), None),
        }
    }
}

/// Result type alias for access-layer operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::configuration("DATABASE_URL is not set");
        assert!(err.to_string().contains("configuration error"));

        let err = DbError::unknown_schema("blog");
        assert_eq!(err.to_string(), "Unknown schema: 'blog'");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::PoolTimeout { wait_secs: 10 }.is_retryable());
        assert!(DbError::StatementTimeout { elapsed_secs: 30 }.is_retryable());
        assert!(DbError::connection_lost("socket reset").is_retryable());
        assert!(!DbError::query_failed("duplicate key", Some("23505".into())).is_retryable());
        assert!(!DbError::unknown_schema("blog").is_retryable());
        assert!(!DbError::configuration("no DSN").is_retryable());
    }

    #[test]
    fn test_sql_state_accessor() {
        let err = DbError::query_failed("undefined table", Some("42P01".to_string()));
        assert_eq!(err.sql_state(), Some("42P01"));
        assert_eq!(DbError::PoolClosed.sql_state(), None);
    }

    #[test]
    fn test_pool_closed_from_sqlx() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::PoolClosed
        ));
    }

    #[test]
    fn test_connection_sql_states() {
        // Server-side termination and connection-exception codes mean the
        // connection is unusable; statement-level codes do not.
        for code in ["57P01", "57P02", "57P03", "08006", "08003"] {
            assert!(is_connection_sql_state(code), "{}", code);
        }
        for code in ["23505", "42601", "42P01", "57014"] {
            assert!(!is_connection_sql_state(code), "{}", code);
        }
    }

    #[test]
    fn test_io_error_marks_connection_lost() {
        let err = DbError::from(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        )));
        match err {
            DbError::QueryFailed {
                connection_lost, ..
            } => assert!(connection_lost),
            other => panic!("expected QueryFailed, got {:?}", other),
        }
    }
}
