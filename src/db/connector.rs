//! Driver seam: opening one session per database name and running statements on it.
//!
//! [`Connector`] and [`Session`] are the only points where the executor
//! touches a driver. [`SqlxConnector`] is the production implementation;
//! each submodule below holds the backend-specific statement execution.

use crate::db::params::{bind_mysql_params, bind_sqlite_params};
use crate::db::types::{RawRow, RowToCells};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionSettings, DatabaseType};
use crate::sql::Statement;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::future::Future;
use std::path::PathBuf;
use tracing::debug;

/// A live connection to one database. Used by one statement at a time.
pub trait Session: Send + 'static {
    /// Round-trip liveness check.
    fn ping(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Execute a statement (autocommit) and fetch every produced row.
    fn fetch_all(&mut self, statement: &Statement)
    -> impl Future<Output = DbResult<Vec<RawRow>>> + Send;

    /// Gracefully close the connection.
    fn close(self) -> impl Future<Output = DbResult<()>> + Send;
}

/// Opens sessions against named databases.
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    /// Backend dialect, used for identifier quoting and metadata queries.
    fn dialect(&self) -> DatabaseType;

    fn connect(&self, database: &str) -> impl Future<Output = DbResult<Self::Session>> + Send;
}

/// Database-specific single connection.
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    SQLite(SqliteConnection),
}

impl Session for DbConnection {
    async fn ping(&mut self) -> DbResult<()> {
        crate::impl_db_dispatch!(self, {
            MySql(c) => c.ping().await.map_err(DbError::from),
            SQLite(c) => c.ping().await.map_err(DbError::from),
        })
    }

    async fn fetch_all(&mut self, statement: &Statement) -> DbResult<Vec<RawRow>> {
        crate::impl_db_dispatch!(self, {
            MySql(c) => mysql::fetch_rows(c, statement).await,
            SQLite(c) => sqlite::fetch_rows(c, statement).await,
        })
    }

    async fn close(self) -> DbResult<()> {
        crate::impl_db_dispatch!(self, {
            MySql(c) => c.close().await.map_err(DbError::from),
            SQLite(c) => c.close().await.map_err(DbError::from),
        })
    }
}

/// Opens real connections with `sqlx` from static settings.
#[derive(Debug, Clone)]
pub struct SqlxConnector {
    settings: ConnectionSettings,
}

impl SqlxConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    fn sqlite_file(dir: &std::path::Path, database: &str) -> DbResult<PathBuf> {
        if database.contains(['/', '\\']) || database.starts_with('.') {
            return Err(DbError::invalid_input(format!(
                "Invalid database name: {}",
                database
            )));
        }
        Ok(ConnectionSettings::sqlite_path(dir, database))
    }
}

impl Connector for SqlxConnector {
    type Session = DbConnection;

    fn dialect(&self) -> DatabaseType {
        self.settings.db_type()
    }

    async fn connect(&self, database: &str) -> DbResult<DbConnection> {
        match &self.settings {
            ConnectionSettings::MySQL {
                host,
                port,
                user,
                password,
            } => {
                debug!(host = %host, port, database, "Opening MySQL connection");
                let options = MySqlConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .password(password)
                    .database(database)
                    .charset("utf8mb4");
                let conn = options
                    .connect()
                    .await
                    .map_err(|e| DbError::from(e).into_connect_failure())?;
                Ok(DbConnection::MySql(conn))
            }
            ConnectionSettings::SQLite { dir } => {
                let path = Self::sqlite_file(dir, database)?;
                debug!(path = %path.display(), "Opening SQLite connection");
                let options = SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true);
                let conn = options
                    .connect()
                    .await
                    .map_err(|e| DbError::from(e).into_connect_failure())?;
                Ok(DbConnection::SQLite(conn))
            }
        }
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;

    pub async fn fetch_rows(
        conn: &mut MySqlConnection,
        statement: &Statement,
    ) -> DbResult<Vec<RawRow>> {
        // When params is empty, use raw SQL so statements the server cannot prepare still run
        let rows = if statement.params.is_empty() {
            use sqlx::Executor;
            (&mut *conn).fetch_all(statement.sql.as_str()).await?
        } else {
            let query = bind_mysql_params(sqlx::query(&statement.sql), &statement.params);
            query.fetch_all(&mut *conn).await?
        };
        Ok(rows.iter().map(RowToCells::to_cells).collect())
    }
}

mod sqlite {
    use super::*;

    pub async fn fetch_rows(
        conn: &mut SqliteConnection,
        statement: &Statement,
    ) -> DbResult<Vec<RawRow>> {
        let rows = if statement.params.is_empty() {
            use sqlx::Executor;
            (&mut *conn).fetch_all(statement.sql.as_str()).await?
        } else {
            let query = bind_sqlite_params(sqlx::query(&statement.sql), &statement.params);
            query.fetch_all(&mut *conn).await?
        };
        Ok(rows.iter().map(RowToCells::to_cells).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_follows_settings() {
        let connector = SqlxConnector::new(ConnectionSettings::mysql("db", 3306, "root", "pw"));
        assert_eq!(connector.dialect(), DatabaseType::MySQL);

        let connector = SqlxConnector::new(ConnectionSettings::sqlite("/tmp"));
        assert_eq!(connector.dialect(), DatabaseType::SQLite);
    }

    #[test]
    fn test_sqlite_file_rejects_paths() {
        let dir = std::path::Path::new("/data");
        assert!(SqlxConnector::sqlite_file(dir, "../etc/passwd").is_err());
        assert!(SqlxConnector::sqlite_file(dir, "a/b").is_err());
        assert!(SqlxConnector::sqlite_file(dir, ".hidden").is_err());
        assert_eq!(
            SqlxConnector::sqlite_file(dir, "shop").unwrap(),
            PathBuf::from("/data/shop.db")
        );
    }

    #[tokio::test]
    async fn test_sqlite_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SqlxConnector::new(ConnectionSettings::sqlite(dir.path()));
        let mut session = connector.connect("scratch").await.unwrap();
        session.ping().await.unwrap();

        let rows = session
            .fetch_all(&Statement {
                sql: "SELECT ? AS greeting".to_string(),
                params: vec!["hi".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].0, "greeting");

        session.close().await.unwrap();
        assert!(dir.path().join("scratch.db").exists());
    }
}
