//! Query-related data models.
//!
//! This module defines the request-side column mappings and the result
//! envelope returned to HTTP clients.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A result row keyed by column name, in select-list order.
pub type Row = Map<String, JsonValue>;

/// Ordered column -> value equality predicates, combined with AND.
///
/// Insertion order determines the order of the rendered clauses.
pub type RowFilter = Vec<(String, String)>;

/// Ordered column -> value pairs supplied in a request body.
pub type RowPayload = Vec<(String, String)>;

/// Count-tagged row envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows_count: usize,
    pub rows: Vec<Row>,
}

/// Serialises as `{}`; the response for statements that produce no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmptyResult {}

/// Result of a CRUD operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// A single row addressed by primary key.
    Row(Row),
    /// A set of rows matched by filters.
    Rows(QueryResult),
    /// The statement produced no rows.
    Empty(EmptyResult),
}

impl Outcome {
    /// Wrap an executor result, where `None` means no rows were produced.
    pub fn from_result(result: Option<QueryResult>) -> Self {
        match result {
            Some(result) => Self::Rows(result),
            None => Self::Empty(EmptyResult {}),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}

/// Body of a raw execute request.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub query: String,
}

/// Convert a JSON object body into an ordered row payload.
///
/// Strings are taken as-is, numbers in their JSON rendering, booleans as
/// `1`/`0`. Nulls, arrays and nested objects are rejected.
pub fn payload_from_json(body: JsonValue) -> DbResult<RowPayload> {
    let JsonValue::Object(map) = body else {
        return Err(DbError::invalid_input("JSON payload must be an object"));
    };

    map.into_iter()
        .map(|(column, value)| {
            let value = match value {
                JsonValue::String(s) => s,
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => String::from(if b { "1" } else { "0" }),
                JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => {
                    return Err(DbError::invalid_input(format!(
                        "Value for column '{}' must be a string, number or boolean",
                        column
                    )));
                }
            };
            Ok((column, value))
        })
        .collect()
}
