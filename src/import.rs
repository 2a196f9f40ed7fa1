//! Bulk import of exported lead and meeting collections from `DATA_DIR`.

use crate::errors::{AppError, ResultExt};
use crate::record::{filter_import_fields, generate_id, now, FieldValue, Record};
use crate::schema::{TableSchema, CREATED_AT, ID, LEADS, MEETINGS};
use crate::store::RecordStore;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Records imported per collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub leads: usize,
    pub meetings: usize,
}

/// Imports `leads.json` and `meetings.json` from `data_dir`.
///
/// A missing file imports nothing. Leads are committed before meetings are
/// read, so a failure in the meetings file leaves imported leads in place.
pub async fn import_all(store: &dyn RecordStore, data_dir: &Path) -> Result<ImportCounts, AppError> {
    let leads = import_collection(store, &LEADS, &data_dir.join("leads.json")).await?;
    let meetings = import_collection(store, &MEETINGS, &data_dir.join("meetings.json")).await?;

    Ok(ImportCounts { leads, meetings })
}

async fn import_collection(
    store: &dyn RecordStore,
    schema: &TableSchema,
    path: &Path,
) -> Result<usize, AppError> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| AppError::Import(format!("Failed to access {}: {}", path.display(), e)))?;
    if !exists {
        tracing::info!("No import file at {}, skipping {}", path.display(), schema.table);
        return Ok(0);
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Import(format!("Failed to read {}: {}", path.display(), e)))?;
    let items: Vec<Value> = serde_json::from_str(&content)
        .map_err(|e| AppError::Import(format!("Failed to parse {}: {}", path.display(), e)))?;

    if items.is_empty() {
        return Ok(0);
    }

    let records = items
        .iter()
        .map(|item| prepare_item(schema, item))
        .collect::<Result<Vec<_>, _>>()?;

    let count = store
        .insert_all(schema, records)
        .await
        .context(format!("Importing {}", path.display()))?;
    tracing::info!("Imported {} {} from {}", count, schema.table, path.display());

    Ok(count)
}

/// Filters one item to declared columns, back-filling `id` and `createdAt`
/// when the export lacks them or holds null.
fn prepare_item(schema: &TableSchema, item: &Value) -> Result<Record, AppError> {
    let fields = item.as_object().ok_or_else(|| {
        AppError::Import(format!(
            "Expected every {} entry to be a JSON object, found: {}",
            schema.table, item
        ))
    })?;

    let mut record = filter_import_fields(schema, fields)?;
    if matches!(record.get(ID), None | Some(FieldValue::Null)) {
        record.insert(ID, FieldValue::Text(generate_id()));
    }
    if matches!(record.get(CREATED_AT), None | Some(FieldValue::Null)) {
        record.insert(CREATED_AT, FieldValue::Timestamp(now()));
    }

    Ok(record)
}
