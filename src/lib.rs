//! REST-MySQL Library
//!
//! Generic CRUD over relational tables: HTTP routes are translated into
//! parameterized statements, run on one cached connection per database with
//! reconnect and backoff, and returned as JSON row envelopes.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod sql;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use service::CrudService;
