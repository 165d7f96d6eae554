//! Schema introspection module.
//!
//! The primary-key column is looked up on every call that needs it; nothing
//! is cached between requests.

use crate::db::connector::Connector;
use crate::db::executor::RetryingExecutor;
use crate::error::DbResult;
use crate::sql::Statement;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Name of the first column the table metadata flags as primary.
    pub async fn primary_key_column<C: Connector>(
        executor: &RetryingExecutor<C>,
        database: &str,
        table: &str,
    ) -> DbResult<Option<String>> {
        let dialect = executor.dialect();
        let statement = Statement::raw(dialect.describe_table_sql(table));
        let Some(description) = executor.run(database, &statement).await? else {
            return Ok(None);
        };

        let column = description
            .rows
            .iter()
            .find_map(|row| dialect.primary_key_field(row));
        debug!(database, table, primary_key = ?column, "Resolved primary key");
        Ok(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::retry::RetryPolicy;
    use crate::db::SqlxConnector;
    use crate::models::ConnectionSettings;

    async fn executor_with(sql: &str) -> (tempfile::TempDir, RetryingExecutor<SqlxConnector>) {
        let dir = tempfile::tempdir().unwrap();
        let executor = RetryingExecutor::new(
            SqlxConnector::new(ConnectionSettings::sqlite(dir.path())),
            RetryPolicy::default(),
        );
        executor.run("shop", &Statement::raw(sql)).await.unwrap();
        (dir, executor)
    }

    #[tokio::test]
    async fn test_primary_key_found() {
        let (_dir, executor) =
            executor_with("CREATE TABLE items (sku TEXT NOT NULL, name TEXT, PRIMARY KEY (sku))")
                .await;
        let pk = SchemaInspector::primary_key_column(&executor, "shop", "items")
            .await
            .unwrap();
        assert_eq!(pk.as_deref(), Some("sku"));
    }

    #[tokio::test]
    async fn test_table_without_primary_key() {
        let (_dir, executor) = executor_with("CREATE TABLE log (line TEXT)").await;
        let pk = SchemaInspector::primary_key_column(&executor, "shop", "log")
            .await
            .unwrap();
        assert_eq!(pk, None);
    }

    #[tokio::test]
    async fn test_missing_table() {
        let (_dir, executor) = executor_with("CREATE TABLE log (line TEXT)").await;
        let pk = SchemaInspector::primary_key_column(&executor, "shop", "nope")
            .await
            .unwrap();
        assert_eq!(pk, None);
    }
}
