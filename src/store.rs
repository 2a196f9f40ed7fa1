//! Record storage.
//!
//! Handlers talk to a [`RecordStore`]; the production implementation is
//! [`PgRecordStore`], which turns each call into one short transaction on a
//! pooled connection.

use crate::errors::{AppError, ResultExt};
use crate::record::{FieldValue, Record};
use crate::schema::{quote_ident, Column, ColumnKind, TableSchema, ID};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres, Row};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Single-table operations shared by both resources.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name of the backing database, reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn list(&self, schema: &TableSchema) -> Result<Vec<Record>, AppError>;

    async fn fetch(&self, schema: &TableSchema, id: &str) -> Result<Option<Record>, AppError>;

    /// Inserts `record` and returns the row as stored.
    async fn insert(&self, schema: &TableSchema, record: Record) -> Result<Record, AppError>;

    /// Overwrites the columns in `record` for row `id` and returns the row as
    /// stored, or `None` when no such row exists.
    async fn update(
        &self,
        schema: &TableSchema,
        id: &str,
        record: Record,
    ) -> Result<Option<Record>, AppError>;

    /// Removes row `id`; `false` when it did not exist.
    async fn delete(&self, schema: &TableSchema, id: &str) -> Result<bool, AppError>;

    /// Inserts every record in one transaction. Any failure rolls back the
    /// whole batch.
    async fn insert_all(&self, schema: &TableSchema, records: Vec<Record>)
        -> Result<usize, AppError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_sql(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema.columns.iter().map(|c| quote_ident(c.name)).collect();
    format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_ident(schema.table)
    )
}

fn select_by_id_sql(schema: &TableSchema) -> String {
    format!("{} WHERE {} = $1", select_sql(schema), quote_ident(ID))
}

/// Declared columns present in `record`, in schema order.
fn present_columns<'a>(
    schema: &'a TableSchema,
    record: &'a Record,
) -> impl Iterator<Item = (&'static Column, &'a FieldValue)> + 'a {
    schema
        .columns
        .iter()
        .filter_map(move |c| record.get(c.name).map(|v| (c, v)))
}

fn insert_sql(schema: &TableSchema, record: &Record) -> String {
    let names: Vec<String> = present_columns(schema, record)
        .map(|(c, _)| quote_ident(c.name))
        .collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(schema.table),
        names.join(", "),
        placeholders.join(", ")
    )
}

fn update_sql(schema: &TableSchema, record: &Record) -> String {
    let assignments: Vec<String> = present_columns(schema, record)
        .enumerate()
        .map(|(i, (c, _))| format!("{} = ${}", quote_ident(c.name), i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quote_ident(schema.table),
        assignments.join(", "),
        quote_ident(ID),
        assignments.len() + 1
    )
}

/// Binds a value with the SQL type of its column, so NULLs reach
/// `TIMESTAMPTZ` columns typed correctly. Text headed for a timestamp column
/// must parse; it is never bound as NULL.
fn bind_field<'q>(
    query: PgQuery<'q>,
    column: &Column,
    value: &FieldValue,
) -> Result<PgQuery<'q>, AppError> {
    let query = match (column.kind, value) {
        (ColumnKind::Text, FieldValue::Null) => query.bind(None::<String>),
        (ColumnKind::Text, FieldValue::Text(s)) => query.bind(s.clone()),
        (ColumnKind::Text, FieldValue::Timestamp(ts)) => {
            query.bind(crate::record::format_timestamp(ts))
        }
        (ColumnKind::Timestamp, FieldValue::Null) => query.bind(None::<DateTime<Utc>>),
        (ColumnKind::Timestamp, FieldValue::Timestamp(ts)) => query.bind(*ts),
        (ColumnKind::Timestamp, FieldValue::Text(s)) => {
            let ts = crate::record::parse_timestamp(s).ok_or_else(|| {
                AppError::InternalError(format!(
                    "Invalid timestamp for '{}': {}",
                    column.name, s
                ))
            })?;
            query.bind(ts)
        }
    };
    Ok(query)
}

fn bind_record<'q>(
    mut query: PgQuery<'q>,
    schema: &TableSchema,
    record: &Record,
) -> Result<PgQuery<'q>, AppError> {
    for (column, value) in present_columns(schema, record) {
        query = bind_field(query, column, value)?;
    }
    Ok(query)
}

/// Decodes a row into a [`Record`] by declared column name. Columns the row
/// does not carry are skipped.
pub fn decode_row(schema: &TableSchema, row: &PgRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in schema.columns {
        let decoded = match column.kind {
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(column.name)
                .map(|v| v.map_or(FieldValue::Null, FieldValue::Text)),
            ColumnKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(column.name)
                .map(|v| v.map_or(FieldValue::Null, FieldValue::Timestamp)),
        };
        match decoded {
            Ok(value) => {
                record.insert(column.name, value);
            }
            Err(sqlx::Error::ColumnNotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(record)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    fn backend(&self) -> &'static str {
        "PostgreSQL"
    }

    async fn list(&self, schema: &TableSchema) -> Result<Vec<Record>, AppError> {
        let rows = sqlx::query(&select_sql(schema))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| decode_row(schema, row).map_err(AppError::from))
            .collect()
    }

    async fn fetch(&self, schema: &TableSchema, id: &str) -> Result<Option<Record>, AppError> {
        let row = sqlx::query(&select_by_id_sql(schema))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| decode_row(schema, &r)).transpose()?)
    }

    async fn insert(&self, schema: &TableSchema, record: Record) -> Result<Record, AppError> {
        let id = match record.get(ID) {
            Some(FieldValue::Text(id)) => id.clone(),
            _ => {
                return Err(AppError::InternalError(format!(
                    "Refusing to insert into {} without an id",
                    schema.table
                )))
            }
        };

        let mut tx = self.pool.begin().await?;

        let sql = insert_sql(schema, &record);
        bind_record(sqlx::query(&sql), schema, &record)?
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Inserting into {}", schema.table))?;

        let row = sqlx::query(&select_by_id_sql(schema))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        match row {
            Some(row) => Ok(decode_row(schema, &row)?),
            None => Err(AppError::InternalError(format!(
                "Failed to retrieve created {}",
                schema.label.to_lowercase()
            ))),
        }
    }

    async fn update(
        &self,
        schema: &TableSchema,
        id: &str,
        record: Record,
    ) -> Result<Option<Record>, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query(&select_by_id_sql(schema))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Ok(None);
        }

        if !record.is_empty() {
            let sql = update_sql(schema, &record);
            bind_record(sqlx::query(&sql), schema, &record)?
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Updating {} {}", schema.table, id))?;
        }

        let row = sqlx::query(&select_by_id_sql(schema))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        match row {
            Some(row) => Ok(Some(decode_row(schema, &row)?)),
            None => Err(AppError::InternalError(format!(
                "Failed to retrieve updated {}",
                schema.label.to_lowercase()
            ))),
        }
    }

    async fn delete(&self, schema: &TableSchema, id: &str) -> Result<bool, AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_ident(schema.table),
            quote_ident(ID)
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_all(
        &self,
        schema: &TableSchema,
        records: Vec<Record>,
    ) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;

        for record in &records {
            let sql = insert_sql(schema, record);
            bind_record(sqlx::query(&sql), schema, record)?
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Importing into {}", schema.table))?;
        }

        tx.commit().await?;

        Ok(records.len())
    }
}
