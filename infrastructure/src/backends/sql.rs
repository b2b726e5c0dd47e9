//! Read-only query backend: `POST /execute_query {query, db_name}`
//!
//! `db_name` selects one of the configured database files. Every request
//! opens its own read-only connection on a blocking thread and closes it
//! when the rows are collected.

use super::error::BackendApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use relay_domain::codes;
use relay_domain::tool::builtin::SQL_ENDPOINT;
use relay_domain::DEFAULT_DB_NAME;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use serde_json::{Map, Number, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct SqlSettings {
    /// Database identifier → file
    pub databases: BTreeMap<String, PathBuf>,
    /// Used when a request names no database
    pub default_db: String,
    pub max_rows: usize,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            databases: BTreeMap::new(),
            default_db: DEFAULT_DB_NAME.to_string(),
            max_rows: 1000,
        }
    }
}

impl SqlSettings {
    pub fn with_database(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.databases.insert(name.into(), path.into());
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub db_name: Option<String>,
}

/// Rows of a finished query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<Value>,
    pub truncated: bool,
}

impl QueryOutput {
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "status": "success",
            "results": self.rows,
            "count": self.rows.len(),
        });
        if self.truncated {
            body["truncated"] = Value::Bool(true);
        }
        body
    }
}

pub fn router(settings: SqlSettings) -> Router {
    Router::new()
        .route(SQL_ENDPOINT, post(execute_query))
        .with_state(Arc::new(settings))
}

async fn execute_query(
    State(settings): State<Arc<SqlSettings>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, BackendApiError> {
    let Json(request) = payload?;
    let output = run_query(&request, &settings).await?;
    Ok(Json(output.to_json()))
}

/// Check a request against the read-only policy and run it.
pub async fn run_query(
    request: &QueryRequest,
    settings: &SqlSettings,
) -> Result<QueryOutput, BackendApiError> {
    let db_name = request
        .db_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&settings.default_db);

    let path = settings.databases.get(db_name).ok_or_else(|| {
        BackendApiError::bad_request(
            codes::UNKNOWN_DATABASE,
            format!("unknown database '{}'", db_name),
        )
    })?;
    if !path.is_file() {
        return Err(BackendApiError::bad_request(
            codes::DATABASE_UNAVAILABLE,
            format!("database '{}' is not available", db_name),
        ));
    }

    let query = request.query.trim();
    if !is_select(query) {
        return Err(BackendApiError::bad_request(
            codes::READ_ONLY_VIOLATION,
            "only SELECT queries are allowed",
        ));
    }
    if has_statement_separator(query) {
        return Err(BackendApiError::bad_request(
            codes::SQL_ERROR,
            "expected a single statement without terminator",
        ));
    }

    debug!("sql[{}]: {}", db_name, query);

    let path = path.clone();
    let query = query.to_string();
    let max_rows = settings.max_rows;
    let output = tokio::task::spawn_blocking(move || select_rows(&path, &query, max_rows))
        .await
        .map_err(|e| BackendApiError::internal(format!("query task failed: {}", e)))??;

    info!("sql[{}]: {} row(s)", db_name, output.rows.len());
    Ok(output)
}

fn is_select(query: &str) -> bool {
    query
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

/// A `;` outside string literals and quoted identifiers.
fn has_statement_separator(query: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in query.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '[' => quote = Some(']'),
                ';' => return true,
                _ => {}
            },
        }
    }
    false
}

fn select_rows(path: &Path, query: &str, max_rows: usize) -> Result<QueryOutput, BackendApiError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| BackendApiError::bad_request(codes::DATABASE_UNAVAILABLE, e.to_string()))?;

    let sql_error = |e: rusqlite::Error| BackendApiError::bad_request(codes::SQL_ERROR, e.to_string());

    let mut stmt = conn.prepare(query).map_err(sql_error)?;
    if !stmt.readonly() {
        return Err(BackendApiError::bad_request(
            codes::READ_ONLY_VIOLATION,
            "statement would modify the database",
        ));
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([]).map_err(sql_error)?;
    let mut collected = Vec::new();
    let mut truncated = false;
    while let Some(row) = rows.next().map_err(sql_error)? {
        if collected.len() == max_rows {
            truncated = true;
            break;
        }
        let mut record = Map::new();
        for (index, column) in columns.iter().enumerate() {
            let value = row.get_ref(index).map_err(sql_error)?;
            record.insert(column.clone(), to_json(value));
        }
        collected.push(Value::Object(record));
    }

    Ok(QueryOutput {
        rows: collected,
        truncated,
    })
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
