//! Uniform step result reported across the process boundary.

use super::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ "success": bool, "error"?: string, "error_kind"?: string, ...fields }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StepResult {
    /// Successful result without fields.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            error_kind: None,
            fields: Map::new(),
        }
    }

    /// Failed result describing `error`.
    pub fn failure(error: &Error) -> Self {
        Self::failed(error.to_string(), error.kind())
    }

    /// Failed result from a message and taxonomy name.
    pub fn failed(message: impl Into<String>, kind: &str) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            error_kind: Some(kind.to_string()),
            fields: Map::new(),
        }
    }

    /// Adds a field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Copies the fields of `other` into this result, overwriting duplicates.
    pub fn merge(&mut self, other: StepResult) {
        self.fields.extend(other.fields);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Single-line JSON rendering.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"error":"cannot serialize result: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}
