use crate::schema::ALL_TABLES;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        ensure_tables(&pool).await?;

        Ok(Self { pool })
    }
}

/// Creates the resource tables when they are absent. Existing tables are left
/// untouched.
pub async fn ensure_tables(pool: &PgPool) -> anyhow::Result<()> {
    for schema in ALL_TABLES {
        sqlx::query(&schema.create_table_sql()).execute(pool).await?;
        tracing::debug!("Table '{}' ready", schema.table);
    }
    Ok(())
}
