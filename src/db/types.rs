//! Database-agnostic type mappings.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders extract a [`Cell`] per column
//!
//! Cells keep decimals and temporal values in their native form; turning them
//! into transport strings is the normalizer's job.

use crate::models::DatabaseType;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Cells
// =============================================================================

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Exact decimal text as reported by the server.
    Decimal(String),
    Date(NaiveDate),
    /// MySQL TIME is an interval: negative and above 24h are valid.
    Time(MySqlTime),
    DateTime(NaiveDateTime),
    Json(JsonValue),
}

/// A row of named cells in select-list order.
pub type RawRow = Vec<(String, Cell)>;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Date,
    Time,
    DateTime,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") || lower == "year"
    {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" {
        return TypeCategory::Json;
    }

    // Temporal - "datetime" before "time" and "date"
    if lower.contains("datetime") || lower.contains("timestamp") {
        return TypeCategory::DateTime;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }
    if lower == "time" {
        return TypeCategory::Time;
    }

    if lower.contains("blob") || lower.contains("binary") {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "enum" || lower == "set" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Decode binary data to a JSON string: UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

// =============================================================================
// Temporal Fallback
// =============================================================================

/// Render a binary-protocol DATE/DATETIME value that chrono cannot represent.
///
/// `buf` is the raw value with its length prefix. All-zero values are sent
/// with length 0 and render as `zero`. Returns `None` for any other layout.
pub fn binary_temporal_text(buf: &[u8], zero: &str) -> Option<String> {
    let (&len, body) = buf.split_first()?;
    if body.len() != usize::from(len) {
        return None;
    }

    match len {
        0 => Some(zero.to_string()),
        4 | 7 | 11 => {
            let year = u16::from_le_bytes([body[0], body[1]]);
            let mut text = format!("{:04}-{:02}-{:02}", year, body[2], body[3]);
            if len >= 7 {
                text.push_str(&format!(" {:02}:{:02}:{:02}", body[4], body[5], body[6]));
            }
            if len == 11 {
                let micros = u32::from_le_bytes([body[7], body[8], body[9], body[10]]);
                if micros != 0 {
                    text.push_str(&format!(".{:06}", micros));
                }
            }
            Some(text)
        }
        _ => None,
    }
}

// =============================================================================
// Row to Cells Trait
// =============================================================================

/// Trait for converting driver rows into named cells.
pub trait RowToCells {
    fn to_cells(&self) -> RawRow;
}

impl RowToCells for MySqlRow {
    fn to_cells(&self) -> RawRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                let value = mysql::decode_column(self, idx, category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

impl RowToCells for SqliteRow {
    fn to_cells(&self) -> RawRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::SQLite);
                let value = sqlite::decode_column(self, idx, category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> Cell {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            // TINYINT(1) is reported as BOOLEAN; keep the stored 0/1
            TypeCategory::Integer | TypeCategory::Boolean => decode_integer(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Date => decode_temporal(row, idx, Cell::Date, "0000-00-00"),
            TypeCategory::Time => decode_temporal::<MySqlTime>(row, idx, Cell::Time, "00:00:00"),
            TypeCategory::DateTime => {
                decode_temporal(row, idx, Cell::DateTime, "0000-00-00 00:00:00")
            }
            TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx),
        }
    }

    /// Decode a temporal column, keeping the server's text for values chrono rejects.
    fn decode_temporal<'r, T>(
        row: &'r MySqlRow,
        idx: usize,
        wrap: fn(T) -> Cell,
        zero: &str,
    ) -> Cell
    where
        T: Decode<'r, sqlx::MySql> + Type<sqlx::MySql>,
    {
        match row.try_get::<Option<T>, _>(idx) {
            Ok(Some(v)) => wrap(v),
            Ok(None) => Cell::Null,
            Err(e) => match raw_temporal_text(row, idx, zero) {
                Some(text) => Cell::Text(text),
                None => {
                    tracing::error!("Failed to decode temporal column {}: {:?}", idx, e);
                    Cell::Null
                }
            },
        }
    }

    fn raw_temporal_text(row: &MySqlRow, idx: usize, zero: &str) -> Option<String> {
        let raw = row.try_get_raw(idx).ok()?;
        let bytes = <&[u8] as Decode<sqlx::MySql>>::decode(raw).ok()?;
        if let Some(text) = binary_temporal_text(bytes, zero) {
            return Some(text);
        }
        // Text protocol: the server already sent canonical text
        std::str::from_utf8(bytes)
            .ok()
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> Cell {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => Cell::Decimal(v.0),
            Ok(None) => Cell::Null,
            Err(e) => {
                tracing::error!("Failed to decode DECIMAL: {:?}", e);
                Cell::Null
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Cell {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return Cell::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return Cell::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return Cell::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return Cell::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return Cell::Int(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return Cell::UInt(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return Cell::UInt(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return Cell::UInt(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            return Cell::UInt(v);
        }
        Cell::Null
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Cell {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return Cell::Float(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return Cell::Float(v.into());
        }
        Cell::Null
    }

    fn decode_binary_col(row: &MySqlRow, idx: usize) -> Cell {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(Cell::Bytes)
            .unwrap_or(Cell::Null)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> Cell {
        row.try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .map(Cell::Json)
            .unwrap_or(Cell::Null)
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> Cell {
        if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
            return Cell::Text(v);
        }
        // VARBINARY-backed expressions and unknown types
        decode_binary_col(row, idx)
    }
}

mod sqlite {
    use super::*;

    /// Decode by the value's runtime storage class; expression columns carry no declared type.
    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> Cell {
        let storage = match row.try_get_raw(idx) {
            Ok(value) if value.is_null() => return Cell::Null,
            Ok(value) => value.type_info().name().to_string(),
            Err(e) => {
                tracing::error!("Failed to read SQLite column {}: {:?}", idx, e);
                return Cell::Null;
            }
        };

        match storage.as_str() {
            "INTEGER" => decode::<i64>(row, idx).map_or(Cell::Null, Cell::Int),
            "REAL" => decode::<f64>(row, idx).map_or(Cell::Null, Cell::Float),
            "BLOB" => decode::<Vec<u8>>(row, idx).map_or(Cell::Null, Cell::Bytes),
            _ => match decode::<String>(row, idx) {
                Some(text) if category == TypeCategory::Json => serde_json::from_str(&text)
                    .map(Cell::Json)
                    .unwrap_or(Cell::Text(text)),
                Some(text) => Cell::Text(text),
                None => Cell::Null,
            },
        }
    }

    fn decode<T>(row: &SqliteRow, idx: usize) -> Option<T>
    where
        T: for<'r> Decode<'r, sqlx::Sqlite> + Type<sqlx::Sqlite>,
    {
        // Storage class already checked by the caller
        match row.try_get_unchecked::<T, _>(idx) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Failed to decode SQLite column {}: {:?}", idx, e);
                None
            }
        }
    }
}
