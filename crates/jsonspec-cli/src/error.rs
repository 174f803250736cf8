//! Error types for the jsonspec CLI
//!
//! Provides structured error types for argument, file, schema and output failures.

use jsonspec_core::SchemaError;
use thiserror::Error;

/// Main error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Schema could not be loaded
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Report could not be serialized
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CliError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CliError::InvalidInput(msg.into())
    }

    /// Create a file error
    pub fn file_error(msg: impl Into<String>) -> Self {
        CliError::FileError(msg.into())
    }

    /// Create a schema error
    pub fn schema_error(msg: impl Into<String>) -> Self {
        CliError::SchemaError(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CliError::InvalidInput(_) | CliError::FileError(_) | CliError::SchemaError(_)
        )
    }
}

impl From<SchemaError> for CliError {
    fn from(err: SchemaError) -> Self {
        if err.is_source_error() {
            CliError::FileError(err.to_string())
        } else if matches!(err, SchemaError::CacheLock(_)) {
            CliError::InternalError(err.to_string())
        } else {
            CliError::SchemaError(err.to_string())
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::SerializationError(format!("YAML error: {}", err))
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display() {
        let err = CliError::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "Invalid input: test error");
    }

    #[test]
    fn test_is_user_error() {
        assert!(CliError::invalid_input("test").is_user_error());
        assert!(CliError::file_error("test").is_user_error());
        assert!(CliError::schema_error("test").is_user_error());
        assert!(!CliError::InternalError("test".to_string()).is_user_error());
        assert!(!CliError::SerializationError("test".to_string()).is_user_error());
    }

    #[test]
    fn test_from_schema_error() {
        let err: CliError = SchemaError::NotAFile {
            path: PathBuf::from("schema.json"),
        }
        .into();
        assert!(matches!(err, CliError::FileError(ref msg) if msg == "Path 'schema.json' is not a file."));

        let err: CliError = SchemaError::UnusedType {
            name: "Extra".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::SchemaError(_)));

        let err: CliError = SchemaError::CacheLock("poisoned".to_string()).into();
        assert!(!err.is_user_error());
    }
}
