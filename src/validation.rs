use crate::errors::AppError;
use crate::schema::TableSchema;
use serde_json::{Map, Value};

/// True when a value counts as missing for a required field.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

/// First required field, in declared order, that is absent or blank.
pub fn first_missing_field(
    schema: &TableSchema,
    fields: &Map<String, Value>,
) -> Option<&'static str> {
    schema
        .required_fields()
        .find(|name| fields.get(*name).map_or(true, is_blank))
}

/// Checks a create or update body against the required set of `schema`.
///
/// Update bodies are full documents, so every required field has to be
/// resent even when unchanged. A body that is not a JSON object has no
/// fields at all.
pub fn validate(schema: &TableSchema, body: &Value) -> Result<(), AppError> {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or(&empty);

    match first_missing_field(schema, fields) {
        Some(field) => Err(AppError::Validation(field.to_string())),
        None => Ok(()),
    }
}
