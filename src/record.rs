//! Typed records and the conversions between JSON bodies, stored rows and
//! response payloads.

use crate::errors::AppError;
use crate::schema::{ColumnKind, TableSchema};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single column value as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// Column name to value. Only declared column names are ever used as keys.
pub type Record = BTreeMap<&'static str, FieldValue>;

/// Opaque 128-bit random identifier for a new record.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time at the precision PostgreSQL stores (microseconds), so a value
/// read back compares equal to the one written.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses an RFC 3339 timestamp, or a naive ISO-8601 one taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Text-column coercion of an arbitrary JSON value.
fn coerce_text(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::String(s) => FieldValue::Text(s.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}

/// Keeps only the client-writable columns present in `body`.
///
/// Unknown keys and server-managed columns (`id`, `createdAt`, `updatedAt`)
/// are dropped.
pub fn filter_client_fields(schema: &TableSchema, body: &Map<String, Value>) -> Record {
    schema
        .writable_columns()
        .filter_map(|column| body.get(column.name).map(|v| (column.name, coerce_text(v))))
        .collect()
}

/// Keeps every declared column present in an import item, server-managed ones
/// included. Timestamp columns must hold a parseable string or null.
pub fn filter_import_fields(
    schema: &TableSchema,
    item: &Map<String, Value>,
) -> Result<Record, AppError> {
    let mut record = Record::new();
    for column in schema.columns {
        let Some(value) = item.get(column.name) else {
            continue;
        };
        let field = match (column.kind, value) {
            (ColumnKind::Text, v) => coerce_text(v),
            (ColumnKind::Timestamp, Value::Null) => FieldValue::Null,
            (ColumnKind::Timestamp, Value::String(s)) => parse_timestamp(s)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| {
                    AppError::Import(format!(
                        "Invalid timestamp for '{}' in {}: {}",
                        column.name, schema.table, s
                    ))
                })?,
            (ColumnKind::Timestamp, other) => {
                return Err(AppError::Import(format!(
                    "Invalid timestamp for '{}' in {}: {}",
                    column.name, schema.table, other
                )))
            }
        };
        record.insert(column.name, field);
    }
    Ok(record)
}

/// Row projector: a stored record as a response object.
///
/// Declared columns missing from the record are omitted; NULL becomes JSON
/// null and timestamps become ISO-8601 strings.
pub fn project(schema: &TableSchema, record: &Record) -> Map<String, Value> {
    let mut out = Map::new();
    for column in schema.columns {
        let Some(field) = record.get(column.name) else {
            continue;
        };
        let value = match field {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Timestamp(ts) => Value::String(format_timestamp(ts)),
        };
        out.insert(column.name.to_string(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CREATED_AT, ID, LEADS, MEETINGS, UPDATED_AT};
    use chrono::TimeZone;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_generate_id_is_uuid() {
        let id = generate_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, generate_id());
    }

    #[test]
    fn test_filter_drops_unknown_and_managed_keys() {
        let body = as_map(json!({
            "id": "client-chosen",
            "createdAt": "2020-01-01T00:00:00Z",
            "leadName": "Acme",
            "favouriteColour": "blue"
        }));

        let record = filter_client_fields(&LEADS, &body);

        assert_eq!(record.len(), 1);
        assert_eq!(record.get("leadName"), Some(&FieldValue::Text("Acme".into())));
        assert!(!record.contains_key(ID));
        assert!(!record.contains_key(CREATED_AT));
    }

    #[test]
    fn test_filter_coerces_non_string_values() {
        let body = as_map(json!({
            "expenses": 120.5,
            "latitude": null,
            "participants": ["ann", "bob"]
        }));

        let record = filter_client_fields(&MEETINGS, &body);

        assert_eq!(record.get("expenses"), Some(&FieldValue::Text("120.5".into())));
        assert_eq!(record.get("latitude"), Some(&FieldValue::Null));
        assert_eq!(
            record.get("participants"),
            Some(&FieldValue::Text("[\"ann\",\"bob\"]".into()))
        );
    }

    #[test]
    fn test_import_filter_keeps_managed_columns() {
        let item = as_map(json!({
            "id": "lead-1",
            "leadName": "Acme",
            "createdAt": "2024-03-01T10:15:30.123456",
            "updatedAt": null,
            "unknown": 1
        }));

        let record = filter_import_fields(&LEADS, &item).unwrap();

        assert_eq!(record.get(ID), Some(&FieldValue::Text("lead-1".into())));
        assert_eq!(record.get(UPDATED_AT), Some(&FieldValue::Null));
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(record.get(CREATED_AT), Some(&FieldValue::Timestamp(expected)));
        assert!(!record.contains_key("unknown"));
    }

    #[test]
    fn test_import_filter_rejects_bad_timestamp() {
        let item = as_map(json!({ "createdAt": "last tuesday" }));
        let err = filter_import_fields(&MEETINGS, &item).unwrap_err();
        assert!(matches!(err, AppError::Import(_)));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_project_formats_timestamps_and_omits_absent_columns() {
        let created = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let mut record = Record::new();
        record.insert(ID, FieldValue::Text("m-1".into()));
        record.insert("meetingTitle", FieldValue::Text("Kickoff".into()));
        record.insert("travelMode", FieldValue::Null);
        record.insert(CREATED_AT, FieldValue::Timestamp(created));

        let out = project(&MEETINGS, &record);

        assert_eq!(out["id"], json!("m-1"));
        assert_eq!(out["meetingTitle"], json!("Kickoff"));
        assert_eq!(out["travelMode"], Value::Null);
        assert_eq!(out["createdAt"], json!("2024-05-06T07:08:09.000000Z"));
        assert!(!out.contains_key("location"));
        assert!(!out.contains_key("updatedAt"));
    }

    #[test]
    fn test_now_round_trips_through_projection() {
        let ts = now();
        let formatted = format_timestamp(&ts);
        assert_eq!(parse_timestamp(&formatted), Some(ts));
    }
}
