use std::fmt;

use serde::{Deserialize, Serialize};

/// Path of the document root in violation reports.
pub const ROOT_PATH: &str = "$";

/// One structural violation found by the schema validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// Dotted field path with bracketed indices, e.g. `steps[0].actions[1].selector`.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Failure of the main parse entry point.
///
/// Serializes to `{"kind": "malformed-document", "message": ...}` or
/// `{"kind": "schema-invalid", "errors": [{path, message}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ParseError {
    /// The text did not deserialize into a document tree at all.
    #[error("malformed document: {message}")]
    MalformedDocument { message: String },
    /// The tree deserialized but broke the test schema. Always the full list.
    #[error("document violates the test schema ({} violations)", .errors.len())]
    SchemaInvalid { errors: Vec<SchemaViolation> },
}

impl ParseError {
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::MalformedDocument { .. } => "malformed-document",
            ParseError::SchemaInvalid { .. } => "schema-invalid",
        }
    }

    /// Human-readable lines, one per problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ParseError::MalformedDocument { message } => vec![message.clone()],
            ParseError::SchemaInvalid { errors } => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "kind": self.kind(), "message": self.to_string() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_document_serializes_tagged() {
        let err = ParseError::MalformedDocument {
            message: "unexpected end of stream".to_string(),
        };
        assert_eq!(
            err.to_json_value(),
            json!({ "kind": "malformed-document", "message": "unexpected end of stream" })
        );
    }

    #[test]
    fn schema_invalid_serializes_every_violation() {
        let err = ParseError::SchemaInvalid {
            errors: vec![
                SchemaViolation::new("id", "missing required field"),
                SchemaViolation::new("steps", "must contain at least one step"),
            ],
        };
        assert_eq!(
            err.to_json_value(),
            json!({
                "kind": "schema-invalid",
                "errors": [
                    { "path": "id", "message": "missing required field" },
                    { "path": "steps", "message": "must contain at least one step" }
                ]
            })
        );
        assert_eq!(err.to_string(), "document violates the test schema (2 violations)");
        assert_eq!(err.messages()[0], "id: missing required field");
    }
}
