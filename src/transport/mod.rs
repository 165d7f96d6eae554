//! Transport layer.
//!
//! - `routes`: the axum router and request validation
//! - `http`: server lifecycle and graceful shutdown

pub mod http;
pub mod routes;

pub use http::HttpTransport;
pub use routes::{AppState, router};
