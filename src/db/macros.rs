//! Database dispatch macros for reducing code duplication.
//!
//! The macros expand to a plain `match` over [`DbConnection`] variants.
//!
//! [`DbConnection`]: crate::db::DbConnection

/// Macro for generating database dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(conn, {
///     MySql(c) => mysql::fetch_rows(c, statement).await,
///     SQLite(c) => sqlite::fetch_rows(c, statement).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::connector::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
