//! Integration tests for build-phase versus runtime initialization.
//!
//! These run entirely offline: build-phase construction must never touch the
//! network, and runtime misconfiguration must fail before any I/O happens.

use schemapool::config::{
    BUILD_PHASE_DSN, Config, ENV_BUILD_PHASE, ENV_CONNECT_TIMEOUT, ENV_DATABASE_URL,
    ENV_FRAMEWORK_PHASE, FRAMEWORK_BUILD_PHASE,
};
use schemapool::{DbAdapter, DbError, QueryParam, Schema};

fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[tokio::test]
async fn test_build_phase_adapter_initializes_without_database() {
    let config = Config::from_lookup(lookup_from(&[(ENV_BUILD_PHASE, "true")])).unwrap();
    assert!(config.build_phase);
    assert_eq!(config.dsn(), BUILD_PHASE_DSN);

    let mut adapter = DbAdapter::new(config);
    adapter.connect().await.unwrap();

    // No connection was dialed.
    let status = adapter.health_check().await;
    assert_eq!(status.pool.total, 0);
}

#[tokio::test]
async fn test_framework_build_phase_initializes_without_database() {
    let config = Config::from_lookup(lookup_from(&[(
        ENV_FRAMEWORK_PHASE,
        FRAMEWORK_BUILD_PHASE,
    )]))
    .unwrap();

    let mut adapter = DbAdapter::new(config);
    adapter.connect().await.unwrap();
}

#[tokio::test]
async fn test_runtime_without_dsn_fails_before_any_io() {
    let result = Config::from_lookup(lookup_from(&[]));
    let err = result.unwrap_err();
    assert!(matches!(err, DbError::Configuration { .. }));
    assert!(err.to_string().contains(ENV_DATABASE_URL));
}

#[tokio::test]
async fn test_build_phase_query_fails_cleanly_not_at_startup() {
    // The placeholder DSN points nowhere. Startup succeeds; only an actual
    // query attempt surfaces the missing database.
    let config = Config::from_lookup(lookup_from(&[
        (ENV_BUILD_PHASE, "1"),
        (ENV_DATABASE_URL, "postgres://u:p@127.0.0.1:1/nodb"),
        (ENV_CONNECT_TIMEOUT, "1"),
    ]))
    .unwrap();

    let mut adapter = DbAdapter::new(config);
    adapter.connect().await.unwrap();

    let result = adapter
        .query(Schema::Wiki, "SELECT $1::int AS n", &[QueryParam::Int(1)])
        .await;
    assert!(result.is_err());
}

#[test]
fn test_unknown_schema_name_rejected_at_the_boundary() {
    // String input from external callers resolves before any pool work.
    let err = "analytics".parse::<Schema>().unwrap_err();
    match err {
        DbError::UnknownSchema { ref name } => assert_eq!(name, "analytics"),
        other => panic!("expected UnknownSchema, got {:?}", other),
    }
}
