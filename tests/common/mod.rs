//! Shared helpers for router-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use sales_crm_api::config::Config;
use sales_crm_api::errors::AppError;
use sales_crm_api::handlers::AppState;
use sales_crm_api::record::{FieldValue, Record};
use sales_crm_api::routes::build_router;
use sales_crm_api::schema::{TableSchema, ID};
use sales_crm_api::store::RecordStore;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

/// In-memory store keyed by table name; rows keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Vec<Record>>>,
}

/// Gives every declared column a value, the way a selected database row does.
fn complete_row(schema: &TableSchema, mut record: Record) -> Record {
    for column in schema.columns {
        record.entry(column.name).or_insert(FieldValue::Null);
    }
    record
}

fn record_id(record: &Record) -> Option<&str> {
    match record.get(ID) {
        Some(FieldValue::Text(id)) => Some(id.as_str()),
        _ => None,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, schema: &TableSchema) -> Result<Vec<Record>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.get(schema.table).cloned().unwrap_or_default())
    }

    async fn fetch(&self, schema: &TableSchema, id: &str) -> Result<Option<Record>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(schema.table)
            .and_then(|rows| rows.iter().find(|r| record_id(r) == Some(id)))
            .cloned())
    }

    async fn insert(&self, schema: &TableSchema, record: Record) -> Result<Record, AppError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(schema.table).or_default();
        let id = record_id(&record)
            .ok_or_else(|| AppError::InternalError("missing id".to_string()))?;
        if rows.iter().any(|r| record_id(r) == Some(id)) {
            return Err(AppError::InternalError(format!("duplicate key {}", id)));
        }
        let row = complete_row(schema, record);
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        schema: &TableSchema,
        id: &str,
        record: Record,
    ) -> Result<Option<Record>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(schema.table)
            .and_then(|rows| rows.iter_mut().find(|r| record_id(r) == Some(id)))
        else {
            return Ok(None);
        };
        row.extend(record);
        Ok(Some(row.clone()))
    }

    async fn delete(&self, schema: &TableSchema, id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(schema.table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| record_id(r) != Some(id));
        Ok(rows.len() < before)
    }

    async fn insert_all(
        &self,
        schema: &TableSchema,
        records: Vec<Record>,
    ) -> Result<usize, AppError> {
        let count = records.len();
        let mut tables = self.tables.write().await;
        let rows = tables.entry(schema.table).or_default();

        let mut seen: Vec<&str> = rows.iter().filter_map(record_id).collect();
        for record in &records {
            let id = record_id(record)
                .ok_or_else(|| AppError::InternalError("missing id".to_string()))?;
            if seen.contains(&id) {
                return Err(AppError::InternalError(format!("duplicate key {}", id)));
            }
            seen.push(id);
        }

        rows.extend(records.into_iter().map(|r| complete_row(schema, r)));
        Ok(count)
    }
}

/// Helper function to create test config
pub fn create_test_config(data_dir: PathBuf) -> Config {
    Config {
        database_url: "postgresql://test".to_string(),
        port: 5000,
        data_dir,
        db_max_connections: 1,
    }
}

pub fn test_app_with_data_dir(data_dir: PathBuf) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let state = Arc::new(AppState {
        config: create_test_config(data_dir),
        store: store.clone(),
    });
    (build_router(state), store)
}

pub fn test_app() -> Router {
    test_app_with_data_dir(PathBuf::from("does-not-exist")).0
}

/// Sends one request through the router and returns status and JSON body.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send_request(app, builder.body(body).unwrap()).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
