//! Query execution engine.
//!
//! [`RetryingExecutor`] runs one statement on the database's cached session
//! and absorbs connectivity failures:
//! - unreachable: sleep per [`RetryPolicy`] and try again, without limit
//! - connection lost: clear every cached session and try again at once
//! - anything else: returned to the caller untouched

use crate::db::connector::Connector;
use crate::db::normalize::normalize;
use crate::db::registry::ConnectionRegistry;
use crate::db::retry::RetryPolicy;
use crate::db::types::RawRow;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, QueryResult};
use crate::sql::Statement;
use tracing::{info, warn};

/// Statement runner with reconnect and backoff.
pub struct RetryingExecutor<C: Connector> {
    registry: ConnectionRegistry<C>,
    policy: RetryPolicy,
}

impl<C: Connector> RetryingExecutor<C> {
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            registry: ConnectionRegistry::new(connector),
            policy,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    pub fn dialect(&self) -> DatabaseType {
        self.registry.dialect()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run a statement; `None` when it produced no rows.
    pub async fn run(&self, database: &str, statement: &Statement) -> DbResult<Option<QueryResult>> {
        let rows = self.run_raw(database, statement).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(normalize(rows)))
    }

    /// Run a statement and return the decoded rows without normalizing them.
    pub async fn run_raw(&self, database: &str, statement: &Statement) -> DbResult<Vec<RawRow>> {
        let mut backoff = self.policy.backoff();

        loop {
            match self.attempt(database, statement).await {
                Ok(rows) => return Ok(rows),
                Err(DbError::Unreachable { message }) => {
                    let delay = backoff.next_delay();
                    warn!(
                        database,
                        error = %message,
                        retry_in_secs = delay.as_secs_f64(),
                        "Database unreachable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(DbError::ConnectionLost { message }) => {
                    warn!(
                        database,
                        error = %message,
                        "Lost connection, clearing all connections and retrying"
                    );
                    self.registry.clear_all().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, database: &str, statement: &Statement) -> DbResult<Vec<RawRow>> {
        let mut handle = self.registry.acquire(database).await?;
        handle.ping().await.map_err(DbError::into_ping_failure)?;

        info!(
            database,
            sql = %statement.sql,
            params = statement.params.len(),
            "Executing statement"
        );
        handle.fetch_all(statement).await
    }

    /// Close every cached connection.
    pub async fn close_all(&self) {
        self.registry.clear_all().await;
        info!("All connections closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connector::Session;
    use crate::db::types::Cell;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Replays scripted connect/fetch results.
    #[derive(Default, Clone)]
    struct ScriptedConnector {
        connects: Arc<Mutex<VecDeque<DbResult<()>>>>,
        fetches: Arc<Mutex<VecDeque<DbResult<Vec<RawRow>>>>>,
    }

    struct ScriptedSession {
        fetches: Arc<Mutex<VecDeque<DbResult<Vec<RawRow>>>>>,
    }

    impl Session for ScriptedSession {
        async fn ping(&mut self) -> DbResult<()> {
            Ok(())
        }

        async fn fetch_all(&mut self, _statement: &Statement) -> DbResult<Vec<RawRow>> {
            self.fetches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn close(self) -> DbResult<()> {
            Ok(())
        }
    }

    impl Connector for ScriptedConnector {
        type Session = ScriptedSession;

        fn dialect(&self) -> DatabaseType {
            DatabaseType::MySQL
        }

        async fn connect(&self, _database: &str) -> DbResult<ScriptedSession> {
            let next = self.connects.lock().unwrap().pop_front().unwrap_or(Ok(()));
            next.map(|_| ScriptedSession {
                fetches: Arc::clone(&self.fetches),
            })
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(4))
    }

    fn one_row() -> Vec<RawRow> {
        vec![vec![("1".to_string(), Cell::Int(1))]]
    }

    #[tokio::test]
    async fn test_empty_result_is_none() {
        let executor = RetryingExecutor::new(ScriptedConnector::default(), fast_policy());
        let result = executor.run("db", &Statement::raw("DELETE FROM t")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_is_retried_until_success() {
        let connector = ScriptedConnector::default();
        {
            let mut connects = connector.connects.lock().unwrap();
            connects.push_back(Err(DbError::unreachable("refused")));
            connects.push_back(Err(DbError::unreachable("refused")));
            connects.push_back(Err(DbError::unreachable("refused")));
        }
        connector.fetches.lock().unwrap().push_back(Ok(one_row()));

        let executor = RetryingExecutor::new(connector.clone(), fast_policy());
        let result = executor.run("db", &Statement::raw("select 1")).await.unwrap();
        let result = result.unwrap();
        assert_eq!(result.rows_count, 1);
        assert!(connector.connects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lost_connection_clears_and_retries() {
        let connector = ScriptedConnector::default();
        {
            let mut fetches = connector.fetches.lock().unwrap();
            fetches.push_back(Err(DbError::connection_lost("server has gone away")));
            fetches.push_back(Ok(one_row()));
        }

        let executor = RetryingExecutor::new(connector, fast_policy());
        let result = executor.run("db", &Statement::raw("select 1")).await.unwrap();
        assert_eq!(result.unwrap().rows_count, 1);
        assert_eq!(executor.registry().connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_without_retry() {
        let connector = ScriptedConnector::default();
        {
            let mut fetches = connector.fetches.lock().unwrap();
            fetches.push_back(Err(DbError::database("You have an error in your SQL syntax", None)));
            fetches.push_back(Ok(one_row()));
        }

        let executor = RetryingExecutor::new(connector.clone(), fast_policy());
        let err = executor.run("db", &Statement::raw("selec 1")).await.unwrap_err();
        assert!(matches!(err, DbError::Database { .. }));
        assert_eq!(connector.fetches.lock().unwrap().len(), 1);
    }
}
