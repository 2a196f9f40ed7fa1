//! Utility to inspect the database schema and print the columns of the
//! service's tables.

use dotenvy::dotenv;
use sales_crm_api::schema::ALL_TABLES;
use sqlx::postgres::PgPoolOptions;
use std::env;

/// Main entry point for the schema inspection utility.
///
/// Connects to the database and lists the columns of `leads` and `meetings`,
/// flagging declared columns that are missing from the live table.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL or DB_URL must be set"))?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    for schema in ALL_TABLES {
        let columns: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_name = $1 ORDER BY ordinal_position",
        )
        .bind(schema.table)
        .fetch_all(&pool)
        .await?;

        if columns.is_empty() {
            println!("- {} (table not found)", schema.table);
            println!();
            continue;
        }

        println!("- {}", schema.table);
        for (col, type_, nullable) in &columns {
            let null_marker = if nullable == "YES" { "" } else { " NOT NULL" };
            println!("  - {}: {}{}", col, type_, null_marker);
        }

        for declared in schema.columns {
            if !columns.iter().any(|(col, _, _)| col == declared.name) {
                println!("  ! missing declared column: {}", declared.name);
            }
        }
        println!();
    }

    Ok(())
}
