//! Error types for the REST-MySQL service.
//!
//! All errors are represented by [`DbError`]. Connectivity variants
//! (`Unreachable`, `ConnectionLost`) are absorbed by the retrying executor and
//! never reach an HTTP client; the remaining variants map onto status codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

/// MySQL client error: can't connect to local server through socket.
const CR_CONNECTION_ERROR: u16 = 2002;
/// MySQL client error: can't connect to server on host.
const CR_CONN_HOST_ERROR: u16 = 2003;
/// MySQL client error: server has gone away.
const CR_SERVER_GONE_ERROR: u16 = 2006;
/// MySQL client error: lost connection during query.
const CR_SERVER_LOST: u16 = 2013;
/// MySQL server error: duplicate entry for key.
const ER_DUP_ENTRY: u16 = 1062;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    /// The database refused or could not be reached. Retried with backoff.
    #[error("Database unreachable: {message}")]
    Unreachable { message: String },

    /// An established connection died. Retried after clearing all handles.
    #[error("Lost connection to database: {message}")]
    ConnectionLost { message: String },

    #[error("{message}")]
    Database {
        message: String,
        /// SQLSTATE or engine error code, when the driver reports one.
        code: Option<String>,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            code,
        }
    }

    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a transient connectivity failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::ConnectionLost { .. })
    }

    /// Treat any failure of a liveness check as a lost connection.
    ///
    /// Unreachable stays unreachable so the executor backs off instead of
    /// spinning on reconnects.
    pub fn into_ping_failure(self) -> Self {
        match self {
            Self::Unreachable { .. } | Self::ConnectionLost { .. } => self,
            other => Self::connection_lost(other.to_string()),
        }
    }

    /// Classify a failure to open a session.
    ///
    /// With no session established there is nothing to lose, so transport
    /// failures of any kind (DNS lookup, reset during handshake) count as
    /// unreachable and are retried with backoff.
    pub fn into_connect_failure(self) -> Self {
        match self {
            Self::ConnectionLost { message } => Self::Unreachable { message },
            other => other,
        }
    }

    /// HTTP status and machine-readable code for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            Self::Database { .. } => (StatusCode::BAD_REQUEST, "database_error"),
            Self::Schema { .. } => (StatusCode::BAD_REQUEST, "schema_error"),
            Self::Unreachable { .. } | Self::ConnectionLost { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "connectivity_error")
            }
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => classify_io(&io_err),
            sqlx::Error::Database(db_err) => {
                if let Some(mysql_err) = db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                {
                    match mysql_err.number() {
                        CR_CONNECTION_ERROR | CR_CONN_HOST_ERROR => {
                            return DbError::unreachable(mysql_err.message());
                        }
                        CR_SERVER_GONE_ERROR | CR_SERVER_LOST => {
                            return DbError::connection_lost(mysql_err.message());
                        }
                        ER_DUP_ENTRY => return DbError::conflict(mysql_err.message()),
                        _ => {}
                    }
                }
                if db_err.is_unique_violation() {
                    return DbError::conflict(db_err.message());
                }
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::Protocol(msg) => DbError::database(format!("Protocol error: {}", msg), None),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            sqlx::Error::PoolClosed => DbError::connection_lost("Connection is closed"),
            sqlx::Error::PoolTimedOut => DbError::unreachable("Timed out acquiring a connection"),
            sqlx::Error::Tls(tls_err) => DbError::database(format!("TLS error: {}", tls_err), None),
            sqlx::Error::RowNotFound => DbError::not_found("No rows returned"),
            sqlx::Error::Configuration(msg) => {
                DbError::internal(format!("Invalid connection configuration: {}", msg))
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col)
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

fn classify_io(io_err: &std::io::Error) -> DbError {
    use std::io::ErrorKind;

    match io_err.kind() {
        ErrorKind::ConnectionRefused
        | ErrorKind::NotFound
        | ErrorKind::AddrNotAvailable
        | ErrorKind::TimedOut
        | ErrorKind::HostUnreachable
        | ErrorKind::NetworkUnreachable => DbError::unreachable(io_err.to_string()),
        _ => DbError::connection_lost(io_err.to_string()),
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for DbError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            info!(error = %self, "Request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
