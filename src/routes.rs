use crate::docs::{serve_openapi_spec, serve_swagger_ui};
use crate::handlers::{
    self, create_record, delete_record, get_record, list_records, update_record, AppState,
    JsonBody,
};
use crate::schema::{TableSchema, LEADS, MEETINGS};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Maximum accepted request body size (5 MiB).
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// The five CRUD routes for one resource, mounted at `/api/{table}`.
pub fn resource_routes(schema: &'static TableSchema) -> Router<Arc<AppState>> {
    let collection = format!("/api/{}", schema.table);
    let item = format!("/api/{}/:id", schema.table);

    Router::new()
        .route(
            &collection,
            get(move |State(state): State<Arc<AppState>>| list_records(state, schema)).post(
                move |State(state): State<Arc<AppState>>, payload: JsonBody| {
                    create_record(state, schema, payload)
                },
            ),
        )
        .route(
            &item,
            get(
                move |State(state): State<Arc<AppState>>, Path(id): Path<String>| {
                    get_record(state, schema, id)
                },
            )
            .put(
                move |State(state): State<Arc<AppState>>,
                      Path(id): Path<String>,
                      payload: JsonBody| update_record(state, schema, id, payload),
            )
            .delete(
                move |State(state): State<Arc<AppState>>, Path(id): Path<String>| {
                    delete_record(state, schema, id)
                },
            ),
        )
}

/// Builds the full application router with middleware applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        // Resources
        .merge(resource_routes(&LEADS))
        .merge(resource_routes(&MEETINGS))
        // Administrative
        .route("/api/import-data", post(handlers::import_data))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
