//! Builds parameterized SELECT, INSERT, UPDATE, DELETE statements.
//!
//! Clause order follows the request: the primary-key predicate first, then
//! filters in insertion order. Every value is a string bound to a `?`
//! placeholder, in the order the placeholders appear in the text.

use crate::models::DatabaseType;

/// A statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

impl Statement {
    /// A verbatim statement with no bound values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Primary-key column and the requested key value.
#[derive(Debug, Clone, Copy)]
pub struct KeyPredicate<'a> {
    pub column: &'a str,
    pub value: &'a str,
}

impl<'a> KeyPredicate<'a> {
    pub fn new(column: &'a str, value: &'a str) -> Self {
        KeyPredicate { column, value }
    }
}

struct StatementBuf {
    dialect: DatabaseType,
    sql: String,
    params: Vec<String>,
}

impl StatementBuf {
    fn new(dialect: DatabaseType, sql: String) -> Self {
        StatementBuf {
            dialect,
            sql,
            params: Vec::new(),
        }
    }

    /// `<col> = ?`, recording the bound value.
    fn equality(&mut self, column: &str, value: &str) -> String {
        self.params.push(value.to_string());
        format!("{} = ?", self.dialect.quote_ident(column))
    }

    /// Appends ` WHERE <key> [AND <filters>]` or ` WHERE <filters>`; nothing when both are absent.
    fn push_where(&mut self, key: Option<KeyPredicate<'_>>, filters: &[(String, String)]) {
        let mut predicates = Vec::with_capacity(filters.len() + 1);
        if let Some(key) = key {
            predicates.push(self.equality(key.column, key.value));
        }
        for (column, value) in filters {
            predicates.push(self.equality(column, value));
        }
        if !predicates.is_empty() {
            self.sql.push_str(" WHERE ");
            self.sql.push_str(&predicates.join(" AND "));
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// `SELECT <columns-or-*> FROM <table> [WHERE ...]`.
pub fn select(
    dialect: DatabaseType,
    table: &str,
    columns: &[String],
    key: Option<KeyPredicate<'_>>,
    filters: &[(String, String)],
) -> Statement {
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(",")
    };
    let mut q = StatementBuf::new(
        dialect,
        format!("SELECT {} FROM {}", projection, dialect.quote_ident(table)),
    );
    q.push_where(key, filters);
    q.finish()
}

/// `INSERT INTO <table>(<columns>) VALUES (<values>)`, key column first when given.
pub fn insert(
    dialect: DatabaseType,
    table: &str,
    key: Option<KeyPredicate<'_>>,
    payload: &[(String, String)],
) -> Statement {
    let mut columns = Vec::with_capacity(payload.len() + 1);
    let mut params = Vec::with_capacity(payload.len() + 1);
    if let Some(key) = key {
        columns.push(dialect.quote_ident(key.column));
        params.push(key.value.to_string());
    }
    for (column, value) in payload {
        columns.push(dialect.quote_ident(column));
        params.push(value.clone());
    }
    let placeholders = vec!["?"; params.len()].join(",");
    Statement {
        sql: format!(
            "INSERT INTO {}({}) VALUES ({})",
            dialect.quote_ident(table),
            columns.join(","),
            placeholders
        ),
        params,
    }
}

/// `UPDATE <table> SET <col = ?,...> [WHERE ...]`.
pub fn update(
    dialect: DatabaseType,
    table: &str,
    payload: &[(String, String)],
    key: Option<KeyPredicate<'_>>,
    filters: &[(String, String)],
) -> Statement {
    let mut q = StatementBuf::new(dialect, format!("UPDATE {} SET ", dialect.quote_ident(table)));
    let assignments = payload
        .iter()
        .map(|(column, value)| q.equality(column, value))
        .collect::<Vec<_>>()
        .join(",");
    q.sql.push_str(&assignments);
    q.push_where(key, filters);
    q.finish()
}

/// `DELETE FROM <table> WHERE <key> [AND <filters>]`.
pub fn delete(
    dialect: DatabaseType,
    table: &str,
    key: KeyPredicate<'_>,
    filters: &[(String, String)],
) -> Statement {
    let mut q = StatementBuf::new(dialect, format!("DELETE FROM {}", dialect.quote_ident(table)));
    q.push_where(Some(key), filters);
    q.finish()
}
