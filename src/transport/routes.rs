//! HTTP routes mapping verbs and URL templates onto CRUD operations.

use crate::db::SqlxConnector;
use crate::error::{DbError, DbResult};
use crate::models::{ExecuteRequest, Outcome, RowFilter, RowPayload, payload_from_json};
use crate::service::CrudService;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get, post};
use axum::{Json, Router};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub type AppState = Arc<CrudService<SqlxConnector>>;

pub const EXECUTE_ROUTE: &str = "/{db}/_execute";
pub const TABLE_ROUTE: &str = "/{db}/{table}/";
pub const ROW_ROUTE: &str = "/{db}/{table}/{id}";
pub const ENDPOINTS_ROUTE: &str = "/endpoints";

/// Route template -> endpoint name, as served by `GET /endpoints`.
pub const ENDPOINTS: &[(&str, &str)] = &[
    (EXECUTE_ROUTE, "execute_direct_query_on_db"),
    (TABLE_ROUTE, "table_operations"),
    (ROW_ROUTE, "row_operations"),
    (ENDPOINTS_ROUTE, "lists_available_endpoints"),
];

pub fn router(service: AppState) -> Router {
    let table_ops = || -> MethodRouter<AppState> {
        get(read_rows)
            .post(create_row)
            .put(update_rows)
            .delete(delete_row)
    };

    Router::new()
        .route(ENDPOINTS_ROUTE, get(list_endpoints))
        .route(EXECUTE_ROUTE, post(execute_query))
        .route("/{db}/{table}", table_ops())
        .route(TABLE_ROUTE, table_ops())
        .route(ROW_ROUTE, table_ops())
        .with_state(service)
}

/// Validated path parameters.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    db: String,
    table: String,
    id: Option<String>,
}

impl Target {
    fn from_path(params: HashMap<String, String>) -> DbResult<Self> {
        let db = params.get("db").map(|s| s.trim()).unwrap_or_default();
        let table = params.get("table").map(|s| s.trim()).unwrap_or_default();
        if db.is_empty() {
            return Err(DbError::invalid_input("Please provide db name"));
        }
        if table.is_empty() {
            return Err(DbError::invalid_input("Please provide table name"));
        }
        let id = params
            .get("id")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(Self {
            db: db.to_string(),
            table: table.to_string(),
            id,
        })
    }
}

fn parse_json(body: &Bytes) -> DbResult<Option<JsonValue>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| DbError::invalid_input(format!("Invalid JSON payload: {}", e)))
}

fn parse_payload(body: &Bytes) -> DbResult<RowPayload> {
    match parse_json(body)? {
        None | Some(JsonValue::Null) => Err(DbError::invalid_input("No JSON Payload Found")),
        Some(value) => payload_from_json(value),
    }
}

async fn list_endpoints() -> Json<Map<String, JsonValue>> {
    let map = ENDPOINTS
        .iter()
        .map(|(route, name)| (route.to_string(), JsonValue::String(name.to_string())))
        .collect();
    Json(map)
}

async fn execute_query(
    State(service): State<AppState>,
    Path(db): Path<String>,
    body: Bytes,
) -> DbResult<Response> {
    let db = db.trim();
    if db.is_empty() {
        return Err(DbError::invalid_input("Please supply a DB name"));
    }
    let request: ExecuteRequest = match parse_json(&body)? {
        None => return Err(DbError::invalid_input("Received empty JSON Payload")),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| DbError::invalid_input(format!("Invalid execute payload: {}", e)))?,
    };
    if request.query.trim().is_empty() {
        return Err(DbError::invalid_input("query must not be empty"));
    }

    let outcome = service.raw_execute(db, &request.query).await?;
    if outcome.is_empty() {
        return Ok(Json(json!({"status": "no-query-response"})).into_response());
    }
    Ok(Json(outcome).into_response())
}

async fn read_rows(
    State(service): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Query(filters): Query<RowFilter>,
) -> DbResult<Json<Outcome>> {
    let target = Target::from_path(params)?;
    debug!(db = %target.db, table = %target.table, id = ?target.id, "Read");
    let outcome = service
        .read(&target.db, &target.table, target.id.as_deref(), &filters)
        .await?;
    Ok(Json(outcome))
}

async fn create_row(
    State(service): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> DbResult<Json<Outcome>> {
    let payload = parse_payload(&body)?;
    let target = Target::from_path(params)?;
    debug!(db = %target.db, table = %target.table, id = ?target.id, "Create");
    let outcome = service
        .create(&target.db, &target.table, target.id.as_deref(), &payload)
        .await?;
    Ok(Json(outcome))
}

async fn update_rows(
    State(service): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Query(filters): Query<RowFilter>,
    body: Bytes,
) -> DbResult<Json<Outcome>> {
    let payload = parse_payload(&body)?;
    let target = Target::from_path(params)?;
    debug!(db = %target.db, table = %target.table, id = ?target.id, "Update");
    let outcome = service
        .update(
            &target.db,
            &target.table,
            target.id.as_deref(),
            &filters,
            &payload,
        )
        .await?;
    Ok(Json(outcome))
}

async fn delete_row(
    State(service): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Query(filters): Query<RowFilter>,
) -> DbResult<Json<Outcome>> {
    let target = Target::from_path(params)?;
    let Some(id) = target.id.as_deref() else {
        return Err(DbError::invalid_input("Please specify the ID"));
    };
    debug!(db = %target.db, table = %target.table, id, "Delete");
    let outcome = service
        .delete(&target.db, &target.table, id, &filters)
        .await?;
    Ok(Json(outcome))
}
