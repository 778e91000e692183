//! Ingestion of Runner snapshots.
//!
//! The main entry point is [`RecordSet::from_json`]. Record arrays that
//! are missing are treated as empty; a record array that is present but
//! is not an array, or a record that does not have its required fields,
//! is reported instead of being skipped.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::types::RecordSet;

/// Errors while ingesting a record snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The snapshot itself is not a JSON object.
    NotAnObject,
    /// A record collection is present but is not an array.
    NotAnArray { field: String },
    /// A record inside a collection failed to deserialize.
    InvalidRecord {
        field: String,
        index: usize,
        message: String,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NotAnObject => write!(f, "record snapshot must be a JSON object"),
            RecordError::NotAnArray { field } => {
                write!(f, "record field '{}' must be an array", field)
            }
            RecordError::InvalidRecord {
                field,
                index,
                message,
            } => write!(f, "{}[{}]: {}", field, index, message),
        }
    }
}

impl std::error::Error for RecordError {}

impl RecordSet {
    /// Build a snapshot from `{entities, dynamic_fields, relationships, transactions}`.
    pub fn from_json(value: &serde_json::Value) -> Result<RecordSet, RecordError> {
        let obj = value.as_object().ok_or(RecordError::NotAnObject)?;
        Ok(RecordSet {
            entities: records(obj, "entities")?,
            dynamic_fields: records(obj, "dynamic_fields")?,
            relationships: records(obj, "relationships")?,
            transactions: records(obj, "transactions")?,
        })
    }
}

/// Deserialize a required-shape array whose absence means "no records".
pub fn records<T: DeserializeOwned>(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<Vec<T>, RecordError> {
    let arr = match obj.get(field) {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(v) => v.as_array().ok_or_else(|| RecordError::NotAnArray {
            field: field.to_string(),
        })?,
    };

    arr.iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone()).map_err(|e| RecordError::InvalidRecord {
                field: field.to_string(),
                index,
                message: e.to_string(),
            })
        })
        .collect()
}
