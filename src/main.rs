use std::sync::Arc;

use sales_crm_api::config::Config;
use sales_crm_api::db::Database;
use sales_crm_api::handlers::AppState;
use sales_crm_api::routes::build_router;
use sales_crm_api::store::PgRecordStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, connects to PostgreSQL (creating
/// the `leads` and `meetings` tables when absent) and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sales_crm_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database connection pool established");

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        store: Arc::new(PgRecordStore::new(db.pool.clone())),
    });

    let app = build_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
