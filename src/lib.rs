//! Sales CRM API Library
//!
//! REST backend for two independent collections, leads and meetings, stored in
//! PostgreSQL.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection pool and table bootstrap.
//! - `docs`: Swagger UI and OpenAPI document endpoints.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `import`: Bulk import from exported JSON files.
//! - `record`: Typed records, input filtering and the row projector.
//! - `routes`: Router assembly and middleware.
//! - `schema`: Table definitions for leads and meetings.
//! - `store`: Storage trait and its PostgreSQL implementation.
//! - `validation`: Required-field checks.

pub mod config;
pub mod db;
pub mod docs;
pub mod errors;
pub mod handlers;
pub mod import;
pub mod record;
pub mod routes;
pub mod schema;
pub mod store;
pub mod validation;
