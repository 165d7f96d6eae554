//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Driver seam and the sqlx-backed connector
//! - Per-database connection registry
//! - Retrying statement execution with backoff
//! - Primary-key introspection
//! - Type mappings and result normalization
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod connector;
pub mod executor;
pub mod normalize;
pub mod params;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod types;

pub use connector::{Connector, DbConnection, Session, SqlxConnector};
pub use executor::RetryingExecutor;
pub use normalize::normalize;
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use retry::{Backoff, RetryPolicy};
pub use schema::SchemaInspector;
pub use types::{Cell, RawRow};
