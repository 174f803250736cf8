//! Validation report types

use serde::{Deserialize, Serialize};

/// Path of the document root
pub const ROOT_PATH: &str = "/";

/// Path of a named child (object key or structure field)
pub fn child_path(parent: &str, key: &str) -> String {
    if parent == ROOT_PATH {
        format!("/{}", key)
    } else {
        format!("{}/{}", parent, key)
    }
}

/// Path of an array entry
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// One diagnostic produced while validating a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Human-readable message
    pub message: String,
    /// Location of the offending value
    pub path: String,
    /// Errors of every union alternative, when the record is a union failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_errors: Vec<ErrorRecord>,
}

impl ErrorRecord {
    /// Create a record without sub-errors
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
            sub_errors: Vec::new(),
        }
    }

    /// Attach nested errors
    pub fn with_sub_errors(mut self, sub_errors: Vec<ErrorRecord>) -> Self {
        self.sub_errors = sub_errors;
        self
    }
}

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Whether the document matched the root type
    pub ok: bool,
    /// Deepest cause of the failure, same as `errors[0]`
    pub first_error: Option<ErrorRecord>,
    /// Every error, deepest first
    pub errors: Vec<ErrorRecord>,
}

impl ValidationReport {
    /// Report of a document that matched
    pub fn passed() -> Self {
        Self {
            ok: true,
            first_error: None,
            errors: Vec::new(),
        }
    }

    /// Build a report from the outcome of a walk
    pub fn from_errors(ok: bool, errors: Vec<ErrorRecord>) -> Self {
        Self {
            ok,
            first_error: errors.first().cloned(),
            errors,
        }
    }

    /// Report for text that is not JSON at all
    pub fn invalid_json(error: &serde_json::Error) -> Self {
        let record = ErrorRecord::new(
            format!(
                "The given JSON is not valid. [{}:{}] {}",
                error.line(),
                error.column(),
                error
            ),
            ROOT_PATH,
        );
        Self::from_errors(false, vec![record])
    }

    /// Number of top-level errors
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
