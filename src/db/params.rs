//! Parameter binding utilities for database queries.
//!
//! Every value reaching the driver is a string; the server applies the
//! column's type when comparing or storing it.

use sqlx::mysql::MySqlArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Sqlite};

/// Bind string parameters to a MySQL query, in placeholder order.
pub(crate) fn bind_mysql_params<'q>(
    mut query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    params: &'q [String],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = query.bind(param.as_str());
    }
    query
}

/// Bind string parameters to a SQLite query, in placeholder order.
pub(crate) fn bind_sqlite_params<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [String],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = query.bind(param.as_str());
    }
    query
}
