//! Generic CRUD execution against any named database.
//!
//! Each call is one or more single-statement round trips; the primary-key
//! column is rediscovered whenever a request addresses a row by id.

use crate::db::{Connector, RetryingExecutor, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{Outcome, RowFilter, RowPayload};
use crate::sql::{self, KeyPredicate, Statement};
use tracing::debug;

pub struct CrudService<C: Connector> {
    executor: RetryingExecutor<C>,
}

impl<C: Connector> CrudService<C> {
    pub fn new(executor: RetryingExecutor<C>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RetryingExecutor<C> {
        &self.executor
    }

    /// Fetch the row addressed by `id`, or every row matching `filters`.
    ///
    /// With an id the single row is returned; an empty result is `NotFound`
    /// either way.
    pub async fn read(
        &self,
        database: &str,
        table: &str,
        id: Option<&str>,
        filters: &RowFilter,
    ) -> DbResult<Outcome> {
        let dialect = self.executor.dialect();
        let statement = match id {
            Some(id) => {
                let pk = self.require_primary_key(database, table).await?;
                sql::select(dialect, table, &[], Some(KeyPredicate::new(&pk, id)), filters)
            }
            None => sql::select(dialect, table, &[], None, filters),
        };

        let result = self.executor.run(database, &statement).await?;
        match (id, result) {
            (Some(_), Some(result)) => result
                .rows
                .into_iter()
                .next()
                .map(Outcome::Row)
                .ok_or_else(|| DbError::not_found("Key does not exist")),
            (Some(_), None) => Err(DbError::not_found("Key does not exist")),
            (None, Some(result)) => Ok(Outcome::Rows(result)),
            (None, None) => Err(DbError::not_found("No data matched")),
        }
    }

    /// Insert a row, then read it back by id, or by its own values when no id was given.
    pub async fn create(
        &self,
        database: &str,
        table: &str,
        id: Option<&str>,
        payload: &RowPayload,
    ) -> DbResult<Outcome> {
        let dialect = self.executor.dialect();
        let pk = SchemaInspector::primary_key_column(&self.executor, database, table).await?;
        let statement = match id {
            Some(id) => {
                let pk = pk.ok_or_else(|| missing_primary_key(table))?;
                sql::insert(dialect, table, Some(KeyPredicate::new(&pk, id)), payload)
            }
            None => sql::insert(dialect, table, None, payload),
        };
        self.executor.run(database, &statement).await?;
        debug!(database, table, "Row inserted");

        match id {
            Some(id) => self.read(database, table, Some(id), &Vec::new()).await,
            None => self.read(database, table, None, payload).await,
        }
    }

    /// Update rows after confirming the target exists.
    pub async fn update(
        &self,
        database: &str,
        table: &str,
        id: Option<&str>,
        filters: &RowFilter,
        payload: &RowPayload,
    ) -> DbResult<Outcome> {
        if payload.is_empty() {
            return Err(DbError::invalid_input("No JSON Payload Found"));
        }
        self.read(database, table, id, filters).await?;

        let dialect = self.executor.dialect();
        let statement = match id {
            Some(id) => {
                let pk = self.require_primary_key(database, table).await?;
                sql::update(dialect, table, payload, Some(KeyPredicate::new(&pk, id)), filters)
            }
            None => sql::update(dialect, table, payload, None, filters),
        };
        let result = self.executor.run(database, &statement).await?;
        Ok(Outcome::from_result(result))
    }

    /// Delete the row addressed by `id` after confirming it exists.
    pub async fn delete(
        &self,
        database: &str,
        table: &str,
        id: &str,
        filters: &RowFilter,
    ) -> DbResult<Outcome> {
        if id.is_empty() {
            return Err(DbError::invalid_input("Please specify the ID"));
        }
        self.read(database, table, Some(id), filters).await?;

        let pk = self.require_primary_key(database, table).await?;
        let statement = sql::delete(
            self.executor.dialect(),
            table,
            KeyPredicate::new(&pk, id),
            filters,
        );
        let result = self.executor.run(database, &statement).await?;
        Ok(Outcome::from_result(result))
    }

    /// Run a caller-supplied statement verbatim.
    pub async fn raw_execute(&self, database: &str, query: &str) -> DbResult<Outcome> {
        let result = self.executor.run(database, &Statement::raw(query)).await?;
        Ok(Outcome::from_result(result))
    }

    /// Close every cached connection.
    pub async fn shutdown(&self) {
        self.executor.close_all().await;
    }

    async fn require_primary_key(&self, database: &str, table: &str) -> DbResult<String> {
        SchemaInspector::primary_key_column(&self.executor, database, table)
            .await?
            .ok_or_else(|| missing_primary_key(table))
    }
}

fn missing_primary_key(table: &str) -> DbError {
    DbError::schema("Table has no primary key column", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{RetryPolicy, SqlxConnector};
    use crate::models::{ConnectionSettings, QueryResult};
    use serde_json::json;

    async fn service() -> (tempfile::TempDir, CrudService<SqlxConnector>) {
        let dir = tempfile::tempdir().unwrap();
        let executor = RetryingExecutor::new(
            SqlxConnector::new(ConnectionSettings::sqlite(dir.path())),
            RetryPolicy::default(),
        );
        let service = CrudService::new(executor);
        service
            .raw_execute(
                "shop",
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, city TEXT)",
            )
            .await
            .unwrap();
        (dir, service)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_then_read_by_id() {
        let (_dir, service) = service().await;
        let created = service
            .create("shop", "users", Some("7"), &pairs(&[("name", "O'Brien")]))
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&created).unwrap(),
            json!({"id": 7, "name": "O'Brien", "city": null})
        );
    }

    #[tokio::test]
    async fn test_read_missing_key_ignores_filters() {
        let (_dir, service) = service().await;
        let err = service
            .read("shop", "users", Some("1"), &pairs(&[("name", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref message } if message == "Key does not exist"));
    }

    #[tokio::test]
    async fn test_read_without_match() {
        let (_dir, service) = service().await;
        let err = service
            .read("shop", "users", None, &Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref message } if message == "No data matched"));
    }

    #[tokio::test]
    async fn test_create_without_id_reads_back_by_payload() {
        let (_dir, service) = service().await;
        let created = service
            .create("shop", "users", None, &pairs(&[("name", "Ann"), ("city", "Cork")]))
            .await
            .unwrap();
        let Outcome::Rows(QueryResult { rows_count, rows }) = created else {
            panic!("expected a row set");
        };
        assert_eq!(rows_count, 1);
        assert_eq!(rows[0]["name"], json!("Ann"));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let (_dir, service) = service().await;
        let err = service
            .update("shop", "users", Some("9"), &Vec::new(), &pairs(&[("name", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_with_empty_payload_is_rejected() {
        let (_dir, service) = service().await;
        service
            .create("shop", "users", Some("1"), &pairs(&[("name", "Ann")]))
            .await
            .unwrap();

        let err = service
            .update("shop", "users", Some("1"), &Vec::new(), &Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { ref message } if message == "No JSON Payload Found"));
    }

    #[tokio::test]
    async fn test_update_and_delete_existing_row() {
        let (_dir, service) = service().await;
        service
            .create("shop", "users", Some("1"), &pairs(&[("name", "Ann")]))
            .await
            .unwrap();

        let updated = service
            .update("shop", "users", Some("1"), &Vec::new(), &pairs(&[("city", "Cork")]))
            .await
            .unwrap();
        assert!(updated.is_empty());

        let row = service.read("shop", "users", Some("1"), &Vec::new()).await.unwrap();
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"id": 1, "name": "Ann", "city": "Cork"})
        );

        let deleted = service.delete("shop", "users", "1", &Vec::new()).await.unwrap();
        assert!(deleted.is_empty());
        assert!(service.read("shop", "users", Some("1"), &Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_id_on_table_without_primary_key() {
        let (_dir, service) = service().await;
        service
            .raw_execute("shop", "CREATE TABLE log (line TEXT)")
            .await
            .unwrap();
        let err = service
            .read("shop", "log", Some("1"), &Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Schema { .. }));
    }
}
