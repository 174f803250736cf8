//! Error types for schema loading
//!
//! Everything in here is fatal: a schema that produces one of these errors is
//! never constructed. Problems found while validating a document are not
//! errors, they are collected into a [`ValidationReport`](crate::ValidationReport).

use std::path::PathBuf;

use thiserror::Error;

/// Load-time error raised while building a [`Schema`](crate::Schema)
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema document does not have the expected top-level shape
    #[error("Malformed schema: {0}")]
    MalformedSchema(String),

    /// A structure field specification does not follow the field grammar
    #[error("Type '{owner}' is not well defined: field '{field}' has a malformed specification '{spec}'.")]
    MalformedFieldSpec {
        owner: String,
        field: String,
        spec: String,
    },

    /// A type specification is neither an alias nor a valid pattern
    #[error("Type '{name}' is not well defined.{}", .detail.as_deref().map(|d| format!(" {d}")).unwrap_or_default())]
    MalformedTypeSpec {
        name: String,
        detail: Option<String>,
    },

    /// A referenced type has no definition
    #[error("Type '{name}' is used but not defined.")]
    UndefinedType { name: String },

    /// A defined type is never referenced
    #[error("Type '{name}' is defined but not used.")]
    UnusedType { name: String },

    /// A type reaches itself without descending into a child value
    #[error("Type '{name}' is defined in terms of itself ({}).", .chain.join(" -> "))]
    CyclicType { name: String, chain: Vec<String> },

    /// The policy is not allowed for the category of its type
    #[error("Unknown policy '{policy}' for type category '{category}'.")]
    UnknownPolicy { category: String, policy: String },

    /// Policies were attached to an alias that does not resolve to a primitive or container
    #[error("Type '{name}' cannot carry policies: it aliases non-primitive type '{target}'.")]
    PolicyTarget { name: String, target: String },

    /// Policies were attached to a union or pattern type
    #[error("Type '{name}' is a {kind} and cannot carry policies.")]
    PolicyUnsupported { name: String, kind: String },

    /// A policy modifier has the wrong shape
    #[error("Policy '{policy}' of type '{name}' is not well defined: {reason}")]
    MalformedPolicy {
        name: String,
        policy: String,
        reason: String,
    },

    /// A source path does not point to a regular file
    #[error("Path '{}' is not a file.", .path.display())]
    NotAFile { path: PathBuf },

    /// A source path could not be read
    #[error("Path '{}' is not readable: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Schema text is not valid JSON
    #[error("Specification is not valid JSON. [{}:{}] {0}", .0.line(), .0.column())]
    InvalidJson(#[source] serde_json::Error),

    /// Schema file is not valid JSON
    #[error("Path '{}' is not a valid JSON file. [{}:{}] {source}", .path.display(), .source.line(), .source.column())]
    InvalidJsonFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The schema cache lock was poisoned by a panicking thread
    #[error("Schema cache is unavailable: {0}")]
    CacheLock(String),
}

impl SchemaError {
    /// Create a malformed schema error
    pub fn malformed(msg: impl Into<String>) -> Self {
        SchemaError::MalformedSchema(msg.into())
    }

    /// Create a malformed type error without further detail
    pub fn malformed_type(name: impl Into<String>) -> Self {
        SchemaError::MalformedTypeSpec {
            name: name.into(),
            detail: None,
        }
    }

    /// Create a malformed policy error
    pub fn malformed_policy(
        name: impl Into<String>,
        policy: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::MalformedPolicy {
            name: name.into(),
            policy: policy.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error comes from reading a source rather than from its content
    pub fn is_source_error(&self) -> bool {
        matches!(self, SchemaError::NotAFile { .. } | SchemaError::Io { .. })
    }
}

/// Result type alias for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;
