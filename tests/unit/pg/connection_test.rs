//! Unit tests for the connection manager and query runner
//!
//! Tests cover:
//! - Retry counting and constant delays (paused tokio clock)
//! - Reuse of a live session and reconnection after a dead one
//! - Query errors that do or do not drop the session
//! - Canonical row sets from raw query output

use crate::common::{catalog_handler, local_params, table, MockConnector};
use pgtester::pgtester::pg::{CellValue, ConnectionManager, PgError, RetryPolicy};
use pgtester::pgtester::test_harness::LogHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn manager(connector: &MockConnector, policy: RetryPolicy) -> ConnectionManager {
    ConnectionManager::new(
        local_params(),
        policy,
        Arc::new(connector.clone()),
        LogHandle::detached(),
    )
}

// =============================================================================
// Retry policy
// =============================================================================

#[test]
fn test_policy_attempts_and_wait_bound() {
    let policy = RetryPolicy::new(4, Duration::from_millis(250));
    assert_eq!(policy.max_attempts(), 5);
    assert_eq!(policy.total_wait(), Duration::from_secs(1));

    let single = RetryPolicy::single_attempt();
    assert_eq!(single.max_attempts(), 1);
    assert_eq!(single.total_wait(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_exhausts_after_retries_plus_one_attempts() {
    for retries in [0u32, 1, 3] {
        let connector = MockConnector::unreachable();
        let mut manager = manager(&connector, RetryPolicy::new(retries, Duration::from_secs(2)));

        let start = Instant::now();
        let err = manager.ensure_connected().await.unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(connector.attempts(), retries + 1);
        assert!(elapsed >= Duration::from_secs(2) * retries);
        assert!(elapsed < Duration::from_secs(2) * (retries + 1));
        match err {
            PgError::ConnectionExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, retries + 1);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(!manager.is_connected());
    }
}

#[tokio::test(start_paused = true)]
async fn test_connects_after_transient_failures() {
    let connector = MockConnector::with_failing_connects(2, catalog_handler);
    let mut manager = manager(&connector, RetryPolicy::new(5, Duration::from_secs(1)));

    let start = Instant::now();
    manager.ensure_connected().await.unwrap();

    assert_eq!(connector.attempts(), 3);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(manager.is_connected());
}

// =============================================================================
// Session reuse
// =============================================================================

#[tokio::test]
async fn test_live_session_is_reused() {
    let connector = MockConnector::new(catalog_handler);
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    manager.run_query("select 4 as n", &[]).await.unwrap();
    manager.run_query("select 5 as n", &[]).await.unwrap();

    assert_eq!(connector.attempts(), 1);
    assert_eq!(connector.queries(), vec!["select 4 as n", "select 5 as n"]);
}

#[tokio::test]
async fn test_dead_session_is_replaced_before_use() {
    let connector = MockConnector::new(catalog_handler);
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    manager.ensure_connected().await.unwrap();
    connector.kill_sessions();
    manager.ensure_connected().await.unwrap();

    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn test_unanswered_ping_replaces_open_session() {
    let connector = MockConnector::new(catalog_handler);
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    manager.run_query("select 4 as n", &[]).await.unwrap();
    connector.stall_sessions();

    let rows = manager.run_query("select 5 as n", &[]).await.unwrap();
    assert_eq!(rows.rows()[0].get("n"), Some("5"));
    assert_eq!(connector.pings(), 1);
    assert_eq!(connector.attempts(), 2);
    assert_eq!(connector.queries(), vec!["select 4 as n", "select 5 as n"]);
}

#[tokio::test]
async fn test_link_fatal_error_drops_session() {
    let connector = MockConnector::new(|sql| match sql {
        "select crash()" => Err(PgError::QueryFailed {
            query: sql.to_string(),
            cause: "connection reset by peer".to_string(),
            link_closed: true,
        }),
        other => catalog_handler(other),
    });
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    let err = manager.run_query("select crash()", &[]).await.unwrap_err();
    assert!(err.is_link_fatal());
    assert!(!manager.is_connected());

    let rows = manager.run_query("select 4 as n", &[]).await.unwrap();
    assert_eq!(rows.rows()[0].get("n"), Some("4"));
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn test_server_error_keeps_session() {
    let connector = MockConnector::new(catalog_handler);
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    let err = manager.run_query("selec oops", &[]).await.unwrap_err();
    match &err {
        PgError::QueryFailed { query, cause, .. } => {
            assert_eq!(query, "selec oops");
            assert!(cause.contains("syntax error"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(manager.is_connected());

    manager.run_query("select 4 as n", &[]).await.unwrap();
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_exhaustion_propagates_from_run_query() {
    let connector = MockConnector::unreachable();
    let mut manager = manager(&connector, RetryPolicy::new(0, Duration::from_millis(10)));

    let err = manager.run_query("select 4 as n", &[]).await.unwrap_err();
    assert!(matches!(err, PgError::ConnectionExhausted { attempts: 1, .. }));
    assert!(connector.queries().is_empty());
}

// =============================================================================
// Result decoding
// =============================================================================

#[tokio::test]
async fn test_rows_keep_server_order() {
    let connector = MockConnector::new(|_| {
        Ok(table(
            &["id", "label"],
            vec![
                vec![CellValue::Integer(2), CellValue::Text("b".to_string())],
                vec![CellValue::Integer(1), CellValue::Null],
            ],
        ))
    });
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    let rows = manager.run_query("select * from t", &[]).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.rows()[0].get("id"), Some("2"));
    assert_eq!(rows.rows()[1].get("label"), Some("nil"));
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let connector = MockConnector::new(catalog_handler);
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    let rows = manager.run_query("select name from empty", &[]).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_malformed_row_fails_whole_query() {
    let connector = MockConnector::new(|_| {
        Ok(table(
            &["a", "b"],
            vec![
                vec![CellValue::Integer(1), CellValue::Integer(2)],
                vec![CellValue::Integer(3)],
            ],
        ))
    });
    let mut manager = manager(&connector, RetryPolicy::single_attempt());

    let err = manager.run_query("select a, b from t", &[]).await.unwrap_err();
    match err {
        PgError::QueryFailed { query, .. } => assert_eq!(query, "select a, b from t"),
        other => panic!("unexpected error: {}", other),
    }
}
