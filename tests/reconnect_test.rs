//! Integration tests for reconnect behavior.
//!
//! A flaky in-memory connector stands in for the database server so outages
//! can be simulated without a network.

use rest_mysql::db::{
    Cell, Connector, DbConnection, RawRow, RetryPolicy, RetryingExecutor, Session, SqlxConnector,
};
use rest_mysql::error::{DbError, DbResult};
use rest_mysql::models::{ConnectionSettings, DatabaseType};
use rest_mysql::service::CrudService;
use rest_mysql::sql::Statement;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Refuses the first `refusals` connects and drops the first `drops` sessions mid-query.
#[derive(Clone, Default)]
struct FlakyConnector {
    refusals: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl FlakyConnector {
    fn new(refusals: usize, drops: usize) -> Self {
        Self {
            refusals: Arc::new(AtomicUsize::new(refusals)),
            drops: Arc::new(AtomicUsize::new(drops)),
            ..Self::default()
        }
    }
}

struct FlakySession {
    drops: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl Session for FlakySession {
    async fn ping(&mut self) -> DbResult<()> {
        Ok(())
    }

    async fn fetch_all(&mut self, _statement: &Statement) -> DbResult<Vec<RawRow>> {
        if take_one(&self.drops) {
            return Err(DbError::connection_lost("server has gone away"));
        }
        Ok(vec![vec![("1".to_string(), Cell::Int(1))]])
    }

    async fn close(self) -> DbResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Connector for FlakyConnector {
    type Session = FlakySession;

    fn dialect(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    async fn connect(&self, _database: &str) -> DbResult<FlakySession> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.refusals) {
            return Err(DbError::unreachable("Connection refused"));
        }
        Ok(FlakySession {
            drops: Arc::clone(&self.drops),
            closes: Arc::clone(&self.closes),
        })
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(4))
}

#[tokio::test]
async fn test_waits_out_unreachable_server() {
    let connector = FlakyConnector::new(5, 0);
    let service = CrudService::new(RetryingExecutor::new(connector.clone(), fast_policy()));

    let outcome = service.raw_execute("shop", "select 1").await.unwrap();
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"rows_count": 1, "rows": [{"1": 1}]})
    );
    assert_eq!(connector.connects.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_lost_connection_clears_every_database() {
    let connector = FlakyConnector::new(0, 0);
    let service = CrudService::new(RetryingExecutor::new(connector.clone(), fast_policy()));

    service.raw_execute("shop", "select 1").await.unwrap();
    service.raw_execute("billing", "select 1").await.unwrap();
    assert_eq!(service.executor().registry().connection_count().await, 2);

    connector.drops.store(1, Ordering::SeqCst);
    service.raw_execute("shop", "select 1").await.unwrap();

    // Both sessions were closed and only shop reconnected
    assert_eq!(connector.closes.load(Ordering::SeqCst), 2);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 3);
    assert_eq!(service.executor().registry().connection_count().await, 1);
}

#[tokio::test]
async fn test_outage_then_drop_recovers() {
    let connector = FlakyConnector::new(2, 1);
    let service = CrudService::new(RetryingExecutor::new(connector.clone(), fast_policy()));

    let outcome = service.raw_execute("shop", "select 1").await.unwrap();
    assert!(!outcome.is_empty());
    assert_eq!(connector.connects.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let connector = FlakyConnector::new(0, 0);
    let service = CrudService::new(RetryingExecutor::new(connector.clone(), fast_policy()));

    service.raw_execute("shop", "select 1").await.unwrap();
    service.shutdown().await;

    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    assert_eq!(service.executor().registry().connection_count().await, 0);
}

/// Counts connects made through the real connector.
struct CountingSqlx {
    inner: SqlxConnector,
    connects: Arc<AtomicUsize>,
}

impl Connector for CountingSqlx {
    type Session = DbConnection;

    fn dialect(&self) -> DatabaseType {
        self.inner.dialect()
    }

    async fn connect(&self, database: &str) -> DbResult<DbConnection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect(database).await
    }
}

fn unresolvable_host() -> SqlxConnector {
    SqlxConnector::new(ConnectionSettings::mysql(
        "nonexistent-host.invalid",
        3306,
        "root",
        "",
    ))
}

#[tokio::test]
async fn test_unresolvable_host_is_unreachable() {
    let connector = unresolvable_host();
    let Ok(result) = tokio::time::timeout(Duration::from_secs(10), connector.connect("shop")).await
    else {
        eprintln!("DNS lookup did not finish, skipping");
        return;
    };
    let err = result.unwrap_err();
    assert!(matches!(err, DbError::Unreachable { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_unresolvable_host_backs_off() {
    let connects = Arc::new(AtomicUsize::new(0));
    let connector = CountingSqlx {
        inner: unresolvable_host(),
        connects: Arc::clone(&connects),
    };
    let executor = RetryingExecutor::new(connector, RetryPolicy::from_secs(30, 300));

    let pending = tokio::time::timeout(
        Duration::from_secs(2),
        executor.run("shop", &Statement::raw("select 1")),
    )
    .await;

    // Still asleep in the first 30s backoff
    assert!(pending.is_err());
    assert!(connects.load(Ordering::SeqCst) <= 1);
}
