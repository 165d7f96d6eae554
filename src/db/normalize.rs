//! Shapes decoded rows for JSON transport.

use crate::db::types::{Cell, RawRow, decode_binary_value};
use crate::models::{QueryResult, Row};
use serde_json::Value as JsonValue;
use sqlx::mysql::types::MySqlTime;

/// Wrap decoded rows in a count-tagged envelope.
///
/// Decimal and temporal cells become their canonical text; everything else
/// keeps its JSON type.
pub fn normalize(rows: Vec<RawRow>) -> QueryResult {
    let rows: Vec<Row> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(column, cell)| (column, normalize_cell(cell)))
                .collect()
        })
        .collect();

    QueryResult {
        rows_count: rows.len(),
        rows,
    }
}

pub fn normalize_cell(cell: Cell) -> JsonValue {
    match cell {
        Cell::Null => JsonValue::Null,
        Cell::Int(v) => JsonValue::Number(v.into()),
        Cell::UInt(v) => JsonValue::Number(v.into()),
        Cell::Float(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        Cell::Text(v) | Cell::Decimal(v) => JsonValue::String(v),
        Cell::Bytes(v) => decode_binary_value(&v),
        Cell::Date(v) => JsonValue::String(v.to_string()),
        Cell::Time(v) => JsonValue::String(time_text(&v)),
        Cell::DateTime(v) => JsonValue::String(v.to_string()),
        Cell::Json(v) => v,
    }
}

/// `[-]HH:MM:SS[.ffffff]`, as MySQL prints TIME values.
fn time_text(time: &MySqlTime) -> String {
    let sign = if time.is_negative() { "-" } else { "" };
    let mut text = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        time.hours(),
        time.minutes(),
        time.seconds()
    );
    if time.microseconds() != 0 {
        text.push_str(&format!(".{:06}", time.microseconds()));
    }
    text
}
