//! Data models for the REST-MySQL service.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionSettings, DatabaseType};
pub use query::{
    EmptyResult, ExecuteRequest, Outcome, QueryResult, Row, RowFilter, RowPayload,
    payload_from_json,
};
