//! Connection-related data models.
//!
//! This module defines the supported backends and the static parameters used
//! to open one connection per database name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::PathBuf;

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Quote an identifier (table or column name) for this backend.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Self::MySQL => format!("`{}`", ident.replace('`', "``")),
            Self::SQLite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Statement describing a table's columns, one row per column.
    pub fn describe_table_sql(&self, table: &str) -> String {
        match self {
            Self::MySQL => format!("DESC {}", self.quote_ident(table)),
            Self::SQLite => format!("PRAGMA table_info({})", self.quote_ident(table)),
        }
    }

    /// Column name of a description row if that row is flagged as primary.
    pub fn primary_key_field(&self, row: &Map<String, JsonValue>) -> Option<String> {
        let (flag, name) = match self {
            Self::MySQL => {
                let is_primary = row.get("Key").and_then(JsonValue::as_str) == Some("PRI");
                (is_primary, row.get("Field"))
            }
            Self::SQLite => {
                let is_primary = match row.get("pk") {
                    Some(JsonValue::Number(n)) => n.as_i64().is_some_and(|pk| pk > 0),
                    Some(JsonValue::String(s)) => s.parse::<i64>().is_ok_and(|pk| pk > 0),
                    _ => false,
                };
                (is_primary, row.get("name"))
            }
        };
        if !flag {
            return None;
        }
        name.and_then(JsonValue::as_str).map(String::from)
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Static connection parameters shared by every database name.
#[derive(Clone)]
pub enum ConnectionSettings {
    MySQL {
        host: String,
        port: u16,
        user: String,
        /// Contains sensitive data - never log
        password: String,
    },
    /// One database file per name inside `dir`.
    SQLite { dir: PathBuf },
}

impl ConnectionSettings {
    pub fn mysql(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::MySQL {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn sqlite(dir: impl Into<PathBuf>) -> Self {
        Self::SQLite { dir: dir.into() }
    }

    pub fn db_type(&self) -> DatabaseType {
        match self {
            Self::MySQL { .. } => DatabaseType::MySQL,
            Self::SQLite { .. } => DatabaseType::SQLite,
        }
    }

    /// File backing the named SQLite database.
    pub fn sqlite_path(dir: &std::path::Path, database: &str) -> PathBuf {
        dir.join(format!("{}.db", database))
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySQL {
                host, port, user, ..
            } => f
                .debug_struct("MySQL")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"****")
                .finish(),
            Self::SQLite { dir } => f.debug_struct("SQLite").field("dir", dir).finish(),
        }
    }
}
