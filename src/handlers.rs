use crate::config::Config;
use crate::errors::AppError;
use crate::import::import_all;
use crate::record::{filter_client_fields, generate_id, now, project, FieldValue};
use crate::schema::{TableSchema, CREATED_AT, ID, UPDATED_AT};
use crate::store::RecordStore;
use crate::validation::validate;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Storage for both resource tables.
    pub store: Arc<dyn RecordStore>,
}

/// Request body as delivered by axum; a rejection is surfaced as a 500.
pub type JsonBody = Result<Json<Value>, JsonRejection>;

/// Health check endpoint.
///
/// Reports the service version and the configured database backend. The
/// database itself is not contacted.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "database": state.store.backend(),
        })),
    )
}

/// GET /api/{resource}
pub async fn list_records(
    state: Arc<AppState>,
    schema: &'static TableSchema,
) -> Result<Json<Vec<Value>>, AppError> {
    tracing::debug!("GET /api/{}", schema.table);

    let records = state.store.list(schema).await?;
    let items = records
        .iter()
        .map(|record| Value::Object(project(schema, record)))
        .collect();

    Ok(Json(items))
}

/// GET /api/{resource}/:id
pub async fn get_record(
    state: Arc<AppState>,
    schema: &'static TableSchema,
    id: String,
) -> Result<Json<Value>, AppError> {
    tracing::debug!("GET /api/{}/{}", schema.table, id);

    let record = state
        .store
        .fetch(schema, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(schema.not_found_message()))?;

    Ok(Json(Value::Object(project(schema, &record))))
}

/// POST /api/{resource}
///
/// Validates the body, assigns `id` and `createdAt`, stores the declared
/// columns and answers with the row as read back.
pub async fn create_record(
    state: Arc<AppState>,
    schema: &'static TableSchema,
    payload: JsonBody,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(body) = payload?;
    tracing::info!("POST /api/{} - creating {}", schema.table, schema.label);

    validate(schema, &body)?;

    let empty = Map::new();
    let mut record = filter_client_fields(schema, body.as_object().unwrap_or(&empty));
    let id = generate_id();
    record.insert(ID, FieldValue::Text(id.clone()));
    record.insert(CREATED_AT, FieldValue::Timestamp(now()));

    let created = state.store.insert(schema, record).await?;
    tracing::info!("{} created: {}", schema.label, id);

    Ok((StatusCode::CREATED, Json(Value::Object(project(schema, &created)))))
}

/// PUT /api/{resource}/:id
///
/// Full-document update: every required field must be present again.
pub async fn update_record(
    state: Arc<AppState>,
    schema: &'static TableSchema,
    id: String,
    payload: JsonBody,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;
    tracing::info!("PUT /api/{}/{}", schema.table, id);

    validate(schema, &body)?;

    let empty = Map::new();
    let mut record = filter_client_fields(schema, body.as_object().unwrap_or(&empty));
    record.insert(UPDATED_AT, FieldValue::Timestamp(now()));

    let updated = state
        .store
        .update(schema, &id, record)
        .await?
        .ok_or_else(|| AppError::NotFound(schema.not_found_message()))?;

    Ok(Json(Value::Object(project(schema, &updated))))
}

/// DELETE /api/{resource}/:id
pub async fn delete_record(
    state: Arc<AppState>,
    schema: &'static TableSchema,
    id: String,
) -> Result<Json<Value>, AppError> {
    tracing::info!("DELETE /api/{}/{}", schema.table, id);

    if !state.store.delete(schema, &id).await? {
        return Err(AppError::NotFound(schema.not_found_message()));
    }

    Ok(Json(json!({ "message": schema.deleted_message() })))
}

/// POST /api/import-data
///
/// Loads `leads.json` and `meetings.json` from the configured data directory.
pub async fn import_data(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    tracing::info!(
        "POST /api/import-data - reading from {}",
        state.config.data_dir.display()
    );

    let counts = import_all(state.store.as_ref(), &state.config.data_dir).await?;

    Ok(Json(json!({
        "message": "Data imported successfully",
        "counts": counts,
    })))
}

